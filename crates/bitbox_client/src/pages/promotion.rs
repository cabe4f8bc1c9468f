use std::sync::Arc;

use bitbox_shared::{
    domain::{ProjectId, ProjectState, PromotionId, StudentId},
    models::{Project, Promotion, Student, UpdatedStudentPutModel},
};
use tokio::sync::Mutex;
use tracing::info;

use super::{confirm, ensure_current, settle_load};
use crate::{
    api::ApiClient,
    collection::{EntityCollection, LoadStatus},
    error::{ClientError, ErrorContext},
    forms::{DeleteStudentDraft, FormController, ProjectDraft, StudentDraft},
    route::Route,
    scope::PageScope,
};

#[derive(Default)]
struct PromotionState {
    promotion: Option<Promotion>,
    promotion_status: LoadStatus,
    students: EntityCollection<Student>,
    students_status: LoadStatus,
    projects: EntityCollection<Project>,
    projects_status: LoadStatus,
    new_student: FormController<StudentDraft>,
    edit_student: FormController<StudentDraft>,
    editing_student: Option<StudentId>,
    delete_student: FormController<DeleteStudentDraft>,
    new_project: FormController<ProjectDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotionSnapshot {
    pub promotion: Option<Promotion>,
    pub promotion_status: LoadStatus,
    pub students: Vec<Student>,
    pub students_status: LoadStatus,
    pub projects: Vec<Project>,
    pub projects_status: LoadStatus,
}

/// One promotion with its students and projects.
pub struct PromotionPage {
    api: Arc<ApiClient>,
    promotion_id: PromotionId,
    scope: PageScope,
    state: Mutex<PromotionState>,
}

impl PromotionPage {
    pub fn new(api: Arc<ApiClient>, promotion_id: PromotionId) -> Self {
        Self {
            api,
            promotion_id,
            scope: PageScope::new(),
            state: Mutex::new(PromotionState::default()),
        }
    }

    pub fn promotion_id(&self) -> &PromotionId {
        &self.promotion_id
    }

    pub fn leave(&self) {
        self.scope.leave();
    }

    /// Fetches details, students and projects concurrently; each slice
    /// settles on its own. Returns the first failure, if any.
    pub async fn load(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();

        let promotion = async {
            let result = self.api.get_promotion(&self.promotion_id).await;
            ensure_current(&self.scope, ticket, "promotion")?;
            let mut state = self.state.lock().await;
            let promotion = settle_load(&mut state.promotion_status, result, "promotion")?;
            state.promotion = Some(promotion);
            Ok::<(), ClientError>(())
        };
        let students = async {
            let result = self.api.list_students(&self.promotion_id).await;
            ensure_current(&self.scope, ticket, "students")?;
            let mut state = self.state.lock().await;
            let students = settle_load(&mut state.students_status, result, "students")?;
            state.students.reset(students);
            Ok::<(), ClientError>(())
        };
        let projects = async {
            let result = self.api.list_projects(&self.promotion_id).await;
            ensure_current(&self.scope, ticket, "projects")?;
            let mut state = self.state.lock().await;
            let projects = settle_load(&mut state.projects_status, result, "projects")?;
            state.projects.reset(projects);
            Ok::<(), ClientError>(())
        };

        let (promotion, students, projects) = futures::join!(promotion, students, projects);
        promotion.and(students).and(projects)
    }

    pub async fn snapshot(&self) -> PromotionSnapshot {
        let state = self.state.lock().await;
        PromotionSnapshot {
            promotion: state.promotion.clone(),
            promotion_status: state.promotion_status.clone(),
            students: state.students.items().to_vec(),
            students_status: state.students_status.clone(),
            projects: state.projects.items().to_vec(),
            projects_status: state.projects_status.clone(),
        }
    }

    pub fn project_route(&self, project_id: &ProjectId) -> Route {
        Route::Project(project_id.clone())
    }

    pub async fn open_new_student(&self) {
        self.state.lock().await.new_student.open();
    }

    pub async fn edit_new_student(&self, f: impl FnOnce(&mut StudentDraft)) {
        self.state.lock().await.new_student.edit(f);
    }

    pub async fn new_student_form(&self) -> FormController<StudentDraft> {
        self.state.lock().await.new_student.clone()
    }

    pub async fn create_student(&self) -> Result<StudentId, ClientError> {
        let ticket = self.scope.ticket();
        let body = self.state.lock().await.new_student.begin_submit()?;

        let result = self.api.create_student(&self.promotion_id, &body).await;
        let mut state = self.state.lock().await;
        let id = confirm(
            &self.scope,
            ticket,
            &mut state.new_student,
            result,
            ErrorContext::General,
            "student creation",
        )?;
        state.students.append(Student {
            id: id.clone(),
            name: body.name,
            surname: body.surname,
            email: body.email,
        });
        state.new_student.succeed();
        info!(student_id = %id, promotion_id = %self.promotion_id, "student added");
        Ok(id)
    }

    /// Opens the edit form pre-filled with the listed student.
    pub async fn open_edit_student(&self, student_id: &StudentId) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if state.edit_student.is_in_flight() {
            return Err(ClientError::InFlight);
        }
        let draft = state
            .students
            .get(student_id)
            .map(StudentDraft::from_student)
            .ok_or(ClientError::InvalidState("student is not listed in this promotion"))?;
        state.edit_student.open_with(draft);
        state.editing_student = Some(student_id.clone());
        Ok(())
    }

    pub async fn edit_student_draft(&self, f: impl FnOnce(&mut StudentDraft)) {
        self.state.lock().await.edit_student.edit(f);
    }

    pub async fn edit_student_form(&self) -> FormController<StudentDraft> {
        self.state.lock().await.edit_student.clone()
    }

    pub async fn update_student(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();
        let (student_id, body) = {
            let mut state = self.state.lock().await;
            let student_id = state
                .editing_student
                .clone()
                .ok_or(ClientError::InvalidState("no student is being edited"))?;
            let body = UpdatedStudentPutModel::from(state.edit_student.begin_submit()?);
            (student_id, body)
        };

        let result = self.api.update_student(&student_id, &body).await;
        let mut state = self.state.lock().await;
        confirm(
            &self.scope,
            ticket,
            &mut state.edit_student,
            result,
            ErrorContext::General,
            "student update",
        )?;
        state.students.replace(Student {
            id: student_id.clone(),
            name: body.name,
            surname: body.surname,
            email: body.email,
        });
        state.editing_student = None;
        state.edit_student.succeed();
        info!(%student_id, "student updated");
        Ok(())
    }

    /// Stages a student for removal; nothing is sent until confirmed.
    pub async fn stage_delete_student(&self, student_id: &StudentId) {
        self.state.lock().await.delete_student.open_with(DeleteStudentDraft {
            student_id: Some(student_id.clone()),
        });
    }

    pub async fn cancel_delete_student(&self) {
        self.state.lock().await.delete_student.close();
    }

    pub async fn delete_student_form(&self) -> FormController<DeleteStudentDraft> {
        self.state.lock().await.delete_student.clone()
    }

    pub async fn confirm_delete_student(&self) -> Result<StudentId, ClientError> {
        let ticket = self.scope.ticket();
        let student_id = self.state.lock().await.delete_student.begin_submit()?;

        let result = self.api.delete_student(&student_id).await;
        let mut state = self.state.lock().await;
        confirm(
            &self.scope,
            ticket,
            &mut state.delete_student,
            result,
            ErrorContext::General,
            "student removal",
        )?;
        state.students.remove(&student_id);
        state.delete_student.succeed();
        info!(%student_id, "student removed");
        Ok(student_id)
    }

    pub async fn open_new_project(&self) {
        self.state.lock().await.new_project.open();
    }

    pub async fn edit_new_project(&self, f: impl FnOnce(&mut ProjectDraft)) {
        self.state.lock().await.new_project.edit(f);
    }

    pub async fn new_project_form(&self) -> FormController<ProjectDraft> {
        self.state.lock().await.new_project.clone()
    }

    /// New projects are listed as not started until the next reload says otherwise.
    pub async fn create_project(&self) -> Result<ProjectId, ClientError> {
        let ticket = self.scope.ticket();
        let body = self.state.lock().await.new_project.begin_submit()?;

        let result = self.api.create_project(&self.promotion_id, &body).await;
        let mut state = self.state.lock().await;
        let id = confirm(
            &self.scope,
            ticket,
            &mut state.new_project,
            result,
            ErrorContext::General,
            "project creation",
        )?;
        state.projects.append(Project {
            id: id.clone(),
            name: body.name,
            description: body.description,
            start_date: body.start_date,
            end_date: body.end_date,
            notation_period_duration: body.notation_period_duration.unwrap_or(0),
            promotion_id: self.promotion_id.clone(),
            state: ProjectState::NotStarted,
        });
        state.new_project.succeed();
        info!(project_id = %id, promotion_id = %self.promotion_id, "project created");
        Ok(id)
    }
}
