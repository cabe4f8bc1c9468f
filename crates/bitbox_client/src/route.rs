use std::fmt;

use bitbox_shared::domain::{GroupId, MfaCodeId, ProjectId, PromotionId, StudentId};

/// Where a flow wants the user to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    ValidateCode(MfaCodeId),
    Register,
    Evaluate,
    Promotion(PromotionId),
    Project(ProjectId),
    StudentMarks {
        group_id: GroupId,
        student_id: StudentId,
    },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::ValidateCode(id) => format!("/login/validate/{id}"),
            Route::Register => "/register".to_string(),
            Route::Evaluate => "/evaluate".to_string(),
            Route::Promotion(id) => format!("/promotions/{id}"),
            Route::Project(id) => format!("/projects/{id}"),
            Route::StudentMarks {
                group_id,
                student_id,
            } => format!("/group/{group_id}/student/{student_id}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
