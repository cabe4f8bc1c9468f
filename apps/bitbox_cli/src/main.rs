use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use bitbox_client::{
    load_settings, ApiClient, AuthController, EvaluationForm, PromotionPage, PromotionsPage,
    ProjectPage, Route, SessionContext, StudentMarksPage, TokenResolver,
};
use bitbox_shared::domain::{EvaluationTokenId, GroupId, ProjectId, PromotionId, StudentId};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bitbox", about = "Command-line client for the Bitbox grading backend")]
struct Cli {
    /// Backend base url; overrides bitbox.toml and the environment.
    #[arg(long)]
    api_url: Option<String>,
    /// Sign in before running the command. The second factor is read from stdin.
    #[arg(long)]
    login: Option<String>,
    #[arg(long, requires = "login")]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Promotions(PromotionsCommand),
    #[command(subcommand)]
    Students(StudentsCommand),
    #[command(subcommand)]
    Projects(ProjectsCommand),
    #[command(subcommand)]
    Groups(GroupsCommand),
    #[command(subcommand)]
    Marks(MarksCommand),
    /// Grade your group with an evaluation token.
    Evaluate {
        token: String,
        /// `student_id=mark` or `student_id=mark:comment`; repeat per student.
        #[arg(long = "grade", value_parser = parse_grade)]
        grades: Vec<GradeArg>,
    },
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum PromotionsCommand {
    List,
    Create {
        title: String,
        /// YYYY-MM-DD
        start_year: String,
        /// YYYY-MM-DD
        end_year: String,
    },
}

#[derive(Subcommand, Debug)]
enum StudentsCommand {
    List {
        promotion_id: String,
    },
    Add {
        promotion_id: String,
        name: String,
        surname: String,
        email: String,
    },
    Update {
        promotion_id: String,
        student_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Remove {
        promotion_id: String,
        student_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectsCommand {
    List {
        promotion_id: String,
    },
    Create {
        promotion_id: String,
        name: String,
        /// YYYY-MM-DDTHH:MM
        #[arg(long)]
        start: String,
        /// YYYY-MM-DDTHH:MM
        #[arg(long)]
        end: String,
        #[arg(long)]
        description: Option<String>,
        /// Days graders get once the project ends.
        #[arg(long)]
        notation_days: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GroupsCommand {
    List {
        project_id: String,
    },
    Create {
        project_id: String,
        name: String,
        #[arg(long = "student")]
        students: Vec<String>,
    },
    Mark {
        project_id: String,
        group_id: String,
        mark: f64,
    },
}

#[derive(Subcommand, Debug)]
enum MarksCommand {
    Show { group_id: String, student_id: String },
}

#[derive(Debug, Clone)]
struct GradeArg {
    student_id: StudentId,
    mark: i64,
    comment: Option<String>,
}

fn parse_grade(raw: &str) -> Result<GradeArg, String> {
    let (student_id, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected student_id=mark[:comment], got `{raw}`"))?;
    let (mark, comment) = match rest.split_once(':') {
        Some((mark, comment)) => (mark, Some(comment.to_string())),
        None => (rest, None),
    };
    let mark = mark
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid mark `{mark}`: {err}"))?;
    Ok(GradeArg {
        student_id: StudentId::from(student_id.trim()),
        mark,
        comment,
    })
}

async fn prompt(label: &str) -> Result<String> {
    let label = label.to_string();
    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut stdout = io::stdout();
        stdout.write_all(label.as_bytes())?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin()
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    })
    .await
    .context("stdin reader panicked")?
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn sign_in(auth: &AuthController, login: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ").await?,
    };
    auth.edit_login(|draft| {
        draft.login = login;
        draft.password = password;
    })
    .await;
    let Route::ValidateCode(mfa_code_id) = auth.login().await.context("login failed")? else {
        bail!("login did not ask for a second factor");
    };

    let code = prompt("Code sent by email: ").await?;
    auth.edit_mfa_code(|draft| draft.code = code).await;
    auth.validate_code(&mfa_code_id)
        .await
        .context("code validation failed")?;
    info!("signed in");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    let api = Arc::new(ApiClient::new(&settings).context("invalid client settings")?);
    let session = SessionContext::new();
    info!(api_url = %api.base_url(), "using backend");

    let auth = AuthController::new(Arc::clone(&api), session.clone());
    if let Some(login) = cli.login {
        sign_in(&auth, login, cli.password).await?;
    }

    match cli.command {
        Command::Promotions(command) => run_promotions(api, session, command).await?,
        Command::Students(command) => run_students(api, command).await?,
        Command::Projects(command) => run_projects(api, command).await?,
        Command::Groups(command) => run_groups(api, command).await?,
        Command::Marks(MarksCommand::Show {
            group_id,
            student_id,
        }) => {
            let page = StudentMarksPage::new(api, GroupId::from(group_id), StudentId::from(student_id));
            page.load().await.context("failed to load marks")?;
            print_json(&page.details().await)?;
        }
        Command::Evaluate { token, grades } => run_evaluation(api, session, token, grades).await?,
        Command::Register {
            username,
            email,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ").await?,
            };
            let confirmation = prompt("Confirm password: ").await?;
            auth.edit_register(|draft| {
                draft.username = username;
                draft.email = email;
                draft.password = password;
                draft.confirm_password = confirmation;
            })
            .await;
            auth.register().await.context("registration failed")?;
            println!("registered");
        }
    }

    Ok(())
}

async fn run_promotions(
    api: Arc<ApiClient>,
    session: SessionContext,
    command: PromotionsCommand,
) -> Result<()> {
    let page = PromotionsPage::new(api, session);
    match command {
        PromotionsCommand::List => {
            page.load().await.context("failed to list promotions")?;
            print_json(&page.promotions().await)?;
        }
        PromotionsCommand::Create {
            title,
            start_year,
            end_year,
        } => {
            page.open_create().await;
            page.edit_create(|draft| {
                draft.title = title;
                draft.start_year = start_year;
                draft.end_year = end_year;
            })
            .await;
            let id = page
                .create_promotion()
                .await
                .context("failed to create promotion")?;
            println!("created promotion {id}");
        }
    }
    Ok(())
}

async fn run_students(api: Arc<ApiClient>, command: StudentsCommand) -> Result<()> {
    match command {
        StudentsCommand::List { promotion_id } => {
            let page = PromotionPage::new(api, PromotionId::from(promotion_id));
            page.load().await.context("failed to load promotion")?;
            print_json(&page.snapshot().await.students)?;
        }
        StudentsCommand::Add {
            promotion_id,
            name,
            surname,
            email,
        } => {
            let page = PromotionPage::new(api, PromotionId::from(promotion_id));
            page.open_new_student().await;
            page.edit_new_student(|draft| {
                draft.name = name;
                draft.surname = surname;
                draft.email = email;
            })
            .await;
            let id = page.create_student().await.context("failed to add student")?;
            println!("added student {id}");
        }
        StudentsCommand::Update {
            promotion_id,
            student_id,
            name,
            surname,
            email,
        } => {
            let page = PromotionPage::new(api, PromotionId::from(promotion_id));
            page.load().await.context("failed to load promotion")?;
            page.open_edit_student(&StudentId::from(student_id.as_str()))
                .await
                .with_context(|| format!("cannot edit student {student_id}"))?;
            page.edit_student_draft(|draft| {
                if let Some(name) = name {
                    draft.name = name;
                }
                if let Some(surname) = surname {
                    draft.surname = surname;
                }
                if let Some(email) = email {
                    draft.email = email;
                }
            })
            .await;
            page.update_student().await.context("failed to update student")?;
            println!("updated student {student_id}");
        }
        StudentsCommand::Remove {
            promotion_id,
            student_id,
        } => {
            let page = PromotionPage::new(api, PromotionId::from(promotion_id));
            page.stage_delete_student(&StudentId::from(student_id)).await;
            let removed = page
                .confirm_delete_student()
                .await
                .context("failed to remove student")?;
            println!("removed student {removed}");
        }
    }
    Ok(())
}

async fn run_projects(api: Arc<ApiClient>, command: ProjectsCommand) -> Result<()> {
    match command {
        ProjectsCommand::List { promotion_id } => {
            let page = PromotionPage::new(api, PromotionId::from(promotion_id));
            page.load().await.context("failed to load promotion")?;
            print_json(&page.snapshot().await.projects)?;
        }
        ProjectsCommand::Create {
            promotion_id,
            name,
            start,
            end,
            description,
            notation_days,
        } => {
            let page = PromotionPage::new(api, PromotionId::from(promotion_id));
            page.open_new_project().await;
            page.edit_new_project(|draft| {
                draft.name = name;
                draft.start_date = start;
                draft.end_date = end;
                draft.description = description.unwrap_or_default();
                draft.notation_period_duration = notation_days.unwrap_or_default();
            })
            .await;
            let id = page.create_project().await.context("failed to create project")?;
            println!("created project {id}");
        }
    }
    Ok(())
}

async fn run_groups(api: Arc<ApiClient>, command: GroupsCommand) -> Result<()> {
    match command {
        GroupsCommand::List { project_id } => {
            let page = ProjectPage::new(api, ProjectId::from(project_id));
            page.load().await.context("failed to load project")?;
            let snapshot = page.snapshot().await;
            print_json(&snapshot.groups)?;
            print_json(&snapshot.ungrouped)?;
        }
        GroupsCommand::Create {
            project_id,
            name,
            students,
        } => {
            let page = ProjectPage::new(api, ProjectId::from(project_id));
            page.load().await.context("failed to load project")?;
            page.open_new_group().await;
            page.set_group_name(name).await;
            for student_id in students {
                page.toggle_student(&StudentId::from(student_id.as_str()), true)
                    .await
                    .with_context(|| format!("cannot add student {student_id}"))?;
            }
            let id = page.create_group().await.context("failed to create group")?;
            println!("created group {id}");
        }
        GroupsCommand::Mark {
            project_id,
            group_id,
            mark,
        } => {
            let page = ProjectPage::new(api, ProjectId::from(project_id));
            page.load().await.context("failed to load project")?;
            page.open_group_mark(&GroupId::from(group_id.as_str()))
                .await
                .with_context(|| format!("cannot mark group {group_id}"))?;
            page.set_group_mark(mark).await;
            let stored = page
                .submit_group_mark()
                .await
                .context("failed to update the group mark")?;
            println!("group {group_id} marked {stored}");
        }
    }
    Ok(())
}

async fn run_evaluation(
    api: Arc<ApiClient>,
    session: SessionContext,
    token: String,
    grades: Vec<GradeArg>,
) -> Result<()> {
    let resolver = TokenResolver::new(Arc::clone(&api), session);
    match resolver.resolve(&EvaluationTokenId::from(token)).await {
        Some(Route::Evaluate) => {}
        Some(_) => bail!("the evaluation token is invalid or expired"),
        None => bail!("an evaluation token is required"),
    }

    let form = EvaluationForm::new(api);
    form.fetch_roster()
        .await
        .context("failed to load the group to evaluate")?;
    for grade in grades {
        let stored = form
            .set_mark(&grade.student_id, grade.mark)
            .await
            .with_context(|| format!("cannot grade student {}", grade.student_id))?;
        if i64::from(stored) != grade.mark {
            info!(student_id = %grade.student_id, requested = grade.mark, stored, "mark clamped");
        }
        if let Some(comment) = grade.comment {
            form.set_comment(&grade.student_id, comment).await?;
        }
    }

    let snapshot = form.snapshot().await;
    for (student, draft) in &snapshot.rows {
        println!(
            "{} {} ({}): {}/20 {}",
            student.name, student.surname, student.student_id, draft.mark, draft.comment
        );
    }
    form.submit().await.context("failed to submit grades")?;
    println!("evaluation submitted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_argument_keeps_colons_in_comments() {
        let grade = parse_grade("s2=18:good: very").expect("grade");
        assert_eq!(grade.student_id, StudentId::from("s2"));
        assert_eq!(grade.mark, 18);
        assert_eq!(grade.comment.as_deref(), Some("good: very"));

        let grade = parse_grade("s1=15").expect("grade");
        assert_eq!(grade.comment, None);
    }

    #[test]
    fn malformed_grade_argument_is_rejected() {
        assert!(parse_grade("s1").is_err());
        assert!(parse_grade("s1=ten").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
