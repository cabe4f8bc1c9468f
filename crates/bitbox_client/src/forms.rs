//! Drafts and the modal controller that submits them.
//!
//! A form owns its draft, a submission-in-flight flag, an error slot and its
//! own visibility. The draft survives failures and is reset only on success.

use bitbox_shared::{
    domain::StudentId,
    error::{DisplayedError, ValidationError},
    models::{
        clamp_group_mark, LoginUserPostModel, MfaCodePostModel, NewGroupPostModel,
        NewProjectPostModel, NewPromotionPostModel, NewStudentPostModel, RegisterUserPostModel,
        Student, UpdatedGroupMarkPutModel,
    },
};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{ClientError, ErrorContext};

pub const NAME_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 128;
pub const PROMOTION_TITLE_MAX_LEN: usize = 255;
pub const PROJECT_NAME_MAX_LEN: usize = 64;
pub const GROUP_NAME_MAX_LEN: usize = 64;

pub trait Draft: Clone + Default {
    type Payload;

    /// Client-side pre-check; the backend stays the authority.
    fn validate(&self) -> Result<Self::Payload, ValidationError>;
}

#[derive(Debug, Clone, Default)]
pub struct FormController<D: Draft> {
    draft: D,
    in_flight: bool,
    error: Option<DisplayedError>,
    visible: bool,
}

impl<D: Draft> FormController<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn edit(&mut self, f: impl FnOnce(&mut D)) {
        f(&mut self.draft);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn error(&self) -> Option<&DisplayedError> {
        self.error.as_ref()
    }

    pub fn open(&mut self) {
        self.visible = true;
        self.error = None;
    }

    /// Opens the form pre-filled, as edit forms do.
    pub fn open_with(&mut self, draft: D) {
        if !self.in_flight {
            self.draft = draft;
        }
        self.open();
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    /// Validates the draft and marks the form as submitting.
    pub fn begin_submit(&mut self) -> Result<D::Payload, ClientError> {
        if self.in_flight {
            return Err(ClientError::InFlight);
        }
        self.error = None;

        match self.draft.validate() {
            Ok(payload) => {
                self.in_flight = true;
                Ok(payload)
            }
            Err(err) => {
                let err = ClientError::from(err);
                self.error = Some(err.displayed(ErrorContext::General));
                Err(err)
            }
        }
    }

    pub fn succeed(&mut self) {
        self.in_flight = false;
        self.error = None;
        self.draft = D::default();
        self.visible = false;
    }

    pub fn fail(&mut self, err: &ClientError, context: ErrorContext) {
        self.in_flight = false;
        self.error = Some(err.displayed(context));
    }

    /// Releases the in-flight flag of a submission whose answer was dropped.
    pub fn abandon(&mut self) {
        self.in_flight = false;
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(trimmed.to_string())
}

fn bounded(field: &'static str, value: String, max: usize) -> Result<String, ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(value)
}

fn required_bounded(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    bounded(field, required(field, value)?, max)
}

/// Secrets are sent as typed; only emptiness is checked.
fn required_secret(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(value.to_string())
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    let value = required(field, value)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate { field })
}

fn parse_date_time(field: &'static str, value: &str) -> Result<NaiveDateTime, ValidationError> {
    let value = required(field, value)?;
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&value, format).ok())
        .ok_or(ValidationError::InvalidDate { field })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionDraft {
    pub title: String,
    pub start_year: String,
    pub end_year: String,
}

impl Draft for PromotionDraft {
    type Payload = NewPromotionPostModel;

    fn validate(&self) -> Result<NewPromotionPostModel, ValidationError> {
        Ok(NewPromotionPostModel {
            title: required_bounded("title", &self.title, PROMOTION_TITLE_MAX_LEN)?,
            start_year: parse_date("start year", &self.start_year)?,
            end_year: parse_date("end year", &self.end_year)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentDraft {
    pub name: String,
    pub surname: String,
    pub email: String,
}

impl StudentDraft {
    pub fn from_student(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            surname: student.surname.clone(),
            email: student.email.clone(),
        }
    }
}

impl Draft for StudentDraft {
    type Payload = NewStudentPostModel;

    fn validate(&self) -> Result<NewStudentPostModel, ValidationError> {
        Ok(NewStudentPostModel {
            name: required_bounded("name", &self.name, NAME_MAX_LEN)?,
            surname: required_bounded("surname", &self.surname, NAME_MAX_LEN)?,
            email: required_bounded("email", &self.email, EMAIL_MAX_LEN)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    /// Days; left empty to let the backend pick its default.
    pub notation_period_duration: String,
}

impl Draft for ProjectDraft {
    type Payload = NewProjectPostModel;

    fn validate(&self) -> Result<NewProjectPostModel, ValidationError> {
        let name = required_bounded("name", &self.name, PROJECT_NAME_MAX_LEN)?;
        let description = Some(self.description.trim())
            .filter(|description| !description.is_empty())
            .map(str::to_string);
        let start_date = parse_date_time("start date", &self.start_date)?;
        let end_date = parse_date_time("end date", &self.end_date)?;

        let duration = self.notation_period_duration.trim();
        let notation_period_duration = if duration.is_empty() {
            None
        } else {
            let days: i32 = duration.parse().map_err(|_| ValidationError::NotANumber {
                field: "notation period duration",
            })?;
            if days < 0 {
                return Err(ValidationError::Negative {
                    field: "notation period duration",
                });
            }
            Some(days)
        };

        Ok(NewProjectPostModel {
            name,
            description,
            start_date,
            end_date,
            notation_period_duration,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    pub selected: Vec<StudentId>,
}

impl GroupDraft {
    pub fn is_selected(&self, student_id: &StudentId) -> bool {
        self.selected.contains(student_id)
    }

    pub fn set_selected(&mut self, student_id: StudentId, checked: bool) {
        if checked {
            if !self.is_selected(&student_id) {
                self.selected.push(student_id);
            }
        } else {
            self.selected.retain(|id| id != &student_id);
        }
    }
}

impl Draft for GroupDraft {
    type Payload = (NewGroupPostModel, Vec<StudentId>);

    fn validate(&self) -> Result<Self::Payload, ValidationError> {
        let name = required_bounded("group name", &self.name, GROUP_NAME_MAX_LEN)?;
        Ok((NewGroupPostModel { name }, self.selected.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupMarkDraft {
    mark: f64,
}

impl GroupMarkDraft {
    pub fn new(mark: f64) -> Self {
        Self {
            mark: clamp_group_mark(mark),
        }
    }

    pub fn mark(&self) -> f64 {
        self.mark
    }

    pub fn set_mark(&mut self, mark: f64) {
        self.mark = clamp_group_mark(mark);
    }
}

impl Draft for GroupMarkDraft {
    type Payload = UpdatedGroupMarkPutModel;

    fn validate(&self) -> Result<UpdatedGroupMarkPutModel, ValidationError> {
        Ok(UpdatedGroupMarkPutModel {
            mark: clamp_group_mark(self.mark),
        })
    }
}

/// Selection staged before the removal confirmation is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteStudentDraft {
    pub student_id: Option<StudentId>,
}

impl Draft for DeleteStudentDraft {
    type Payload = StudentId;

    fn validate(&self) -> Result<StudentId, ValidationError> {
        self.student_id
            .clone()
            .ok_or(ValidationError::Required { field: "student" })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginDraft {
    pub login: String,
    pub password: String,
}

impl Draft for LoginDraft {
    type Payload = LoginUserPostModel;

    fn validate(&self) -> Result<LoginUserPostModel, ValidationError> {
        Ok(LoginUserPostModel {
            login: required("login", &self.login)?,
            password: required_secret("password", &self.password)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MfaCodeDraft {
    pub code: String,
}

impl Draft for MfaCodeDraft {
    type Payload = MfaCodePostModel;

    fn validate(&self) -> Result<MfaCodePostModel, ValidationError> {
        Ok(MfaCodePostModel {
            code: required("code", &self.code)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterDraft {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Draft for RegisterDraft {
    type Payload = RegisterUserPostModel;

    fn validate(&self) -> Result<RegisterUserPostModel, ValidationError> {
        let username = required("username", &self.username)?;
        let email = required_bounded("email", &self.email, EMAIL_MAX_LEN)?;
        let password = required_secret("password", &self.password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(RegisterUserPostModel {
            username,
            email,
            password,
        })
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
