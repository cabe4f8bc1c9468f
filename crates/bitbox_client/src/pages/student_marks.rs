use std::sync::Arc;

use bitbox_shared::{
    domain::{GroupId, StudentId},
    models::StudentGroupMarkDetails,
};
use tokio::sync::Mutex;

use super::{ensure_current, settle_load};
use crate::{api::ApiClient, collection::LoadStatus, error::ClientError, scope::PageScope};

#[derive(Default)]
struct StudentMarksState {
    status: LoadStatus,
    details: Option<StudentGroupMarkDetails>,
}

/// The marks a student received from their group mates.
pub struct StudentMarksPage {
    api: Arc<ApiClient>,
    group_id: GroupId,
    student_id: StudentId,
    scope: PageScope,
    state: Mutex<StudentMarksState>,
}

impl StudentMarksPage {
    pub fn new(api: Arc<ApiClient>, group_id: GroupId, student_id: StudentId) -> Self {
        Self {
            api,
            group_id,
            student_id,
            scope: PageScope::new(),
            state: Mutex::new(StudentMarksState::default()),
        }
    }

    pub fn leave(&self) {
        self.scope.leave();
    }

    pub async fn load(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();
        let result = self.api.student_marks(&self.group_id, &self.student_id).await;
        ensure_current(&self.scope, ticket, "student marks")?;

        let mut state = self.state.lock().await;
        let details = settle_load(&mut state.status, result, "student marks")?;
        state.details = Some(details);
        Ok(())
    }

    pub async fn status(&self) -> LoadStatus {
        self.state.lock().await.status.clone()
    }

    pub async fn details(&self) -> Option<StudentGroupMarkDetails> {
        self.state.lock().await.details.clone()
    }
}
