//! Grader-facing flow: exchange an evaluation token for a session, then mark
//! every member of the grader's group in one batch.

use std::sync::Arc;

use bitbox_shared::{
    domain::{EvaluationTokenId, GroupId, StudentId},
    error::DisplayedError,
    models::{clamp_mark, GradedStudentPostModel, MinimalGroupStudents, MinimalStudent},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    api::ApiClient,
    error::{ClientError, ErrorContext},
    route::Route,
    scope::PageScope,
    session::SessionContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Pending,
    Resolving,
    Valid,
    Invalid,
}

pub struct TokenResolver {
    api: Arc<ApiClient>,
    session: SessionContext,
    scope: PageScope,
    state: Mutex<TokenState>,
}

impl TokenResolver {
    pub fn new(api: Arc<ApiClient>, session: SessionContext) -> Self {
        Self {
            api,
            session,
            scope: PageScope::new(),
            state: Mutex::new(TokenState::Pending),
        }
    }

    pub fn leave(&self) {
        self.scope.leave();
    }

    pub async fn state(&self) -> TokenState {
        *self.state.lock().await
    }

    /// Drops whatever session was active and trades the token for a new one.
    ///
    /// Returns where to go next, or `None` for an empty token and for an answer
    /// that was overtaken by a newer call or by leaving the page. Calling again
    /// with the same token is safe: the backend decides validity.
    pub async fn resolve(&self, token_id: &EvaluationTokenId) -> Option<Route> {
        if token_id.as_str().trim().is_empty() {
            return None;
        }

        let ticket = self.scope.restart();
        *self.state.lock().await = TokenState::Resolving;
        self.session.clear().await;

        let outcome = match self.api.clear_session().await {
            Ok(()) => self.api.resolve_evaluation_token(token_id).await,
            Err(err) => Err(err),
        };
        if !self.scope.is_current(ticket) {
            debug!("dropping evaluation token answer that was overtaken");
            return None;
        }

        let (state, route) = match outcome {
            Ok(()) => {
                info!("evaluation token accepted");
                (TokenState::Valid, Route::Evaluate)
            }
            Err(err) => {
                warn!(error = %err, "evaluation token rejected");
                (TokenState::Invalid, Route::Login)
            }
        };
        *self.state.lock().await = state;
        Some(route)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationPhase {
    FetchingRoster,
    RosterFailed(DisplayedError),
    Editing,
    Submitting,
    Submitted,
    SubmitFailed(DisplayedError),
}

impl EvaluationPhase {
    fn accepts_edits(&self) -> bool {
        matches!(self, EvaluationPhase::Editing | EvaluationPhase::SubmitFailed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeDraft {
    pub student_id: StudentId,
    pub mark: u8,
    pub comment: String,
}

impl GradeDraft {
    fn seeded(student_id: StudentId) -> Self {
        Self {
            student_id,
            mark: 0,
            comment: String::new(),
        }
    }

    fn to_post_model(&self) -> GradedStudentPostModel {
        GradedStudentPostModel {
            student_id: self.student_id.clone(),
            mark: self.mark,
            comment: Some(self.comment.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationSnapshot {
    pub phase: EvaluationPhase,
    pub group_id: Option<GroupId>,
    pub rows: Vec<(MinimalStudent, GradeDraft)>,
}

#[derive(Default)]
struct Roster {
    group_id: Option<GroupId>,
    students: Vec<MinimalStudent>,
    drafts: Vec<GradeDraft>,
}

impl Roster {
    fn seed(group: MinimalGroupStudents) -> Self {
        let mut students: Vec<MinimalStudent> = Vec::with_capacity(group.students.len());
        for student in group.students {
            if students.iter().any(|seen| seen.student_id == student.student_id) {
                warn!(student_id = %student.student_id, "duplicate roster entry ignored");
                continue;
            }
            students.push(student);
        }
        let drafts = students
            .iter()
            .map(|student| GradeDraft::seeded(student.student_id.clone()))
            .collect();
        Self {
            group_id: Some(group.group_id),
            students,
            drafts,
        }
    }

    fn draft_mut(&mut self, student_id: &StudentId) -> Option<&mut GradeDraft> {
        self.drafts
            .iter_mut()
            .find(|draft| &draft.student_id == student_id)
    }

    fn batch(&self) -> Vec<GradedStudentPostModel> {
        self.drafts.iter().map(GradeDraft::to_post_model).collect()
    }
}

struct EvaluationState {
    phase: EvaluationPhase,
    roster: Roster,
}

pub struct EvaluationForm {
    api: Arc<ApiClient>,
    scope: PageScope,
    inner: Mutex<EvaluationState>,
}

impl EvaluationForm {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            scope: PageScope::new(),
            inner: Mutex::new(EvaluationState {
                phase: EvaluationPhase::FetchingRoster,
                roster: Roster::default(),
            }),
        }
    }

    pub fn leave(&self) {
        self.scope.leave();
    }

    pub async fn phase(&self) -> EvaluationPhase {
        self.inner.lock().await.phase.clone()
    }

    pub async fn snapshot(&self) -> EvaluationSnapshot {
        let guard = self.inner.lock().await;
        EvaluationSnapshot {
            phase: guard.phase.clone(),
            group_id: guard.roster.group_id.clone(),
            rows: guard
                .roster
                .students
                .iter()
                .cloned()
                .zip(guard.roster.drafts.iter().cloned())
                .collect(),
        }
    }

    /// Loads the grader's group and seeds one zeroed draft per member.
    pub async fn fetch_roster(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();
        {
            let mut guard = self.inner.lock().await;
            if guard.phase == EvaluationPhase::Submitting {
                return Err(ClientError::InFlight);
            }
            guard.phase = EvaluationPhase::FetchingRoster;
        }

        let result = self.api.group_to_evaluate().await;
        if !self.scope.is_current(ticket) {
            debug!("dropping roster that arrived after the evaluation page was left");
            return Err(ClientError::PageLeft);
        }

        let mut guard = self.inner.lock().await;
        match result {
            Ok(group) => {
                guard.roster = Roster::seed(group);
                guard.phase = EvaluationPhase::Editing;
                info!(
                    group_id = ?guard.roster.group_id,
                    students = guard.roster.students.len(),
                    "evaluation roster loaded"
                );
                Ok(())
            }
            Err(err) => {
                guard.phase = EvaluationPhase::RosterFailed(err.displayed(ErrorContext::General));
                Err(err)
            }
        }
    }

    /// Sets a student's mark, clamped to the grading range. Returns the stored value.
    pub async fn set_mark(&self, student_id: &StudentId, mark: i64) -> Result<u8, ClientError> {
        let mut guard = self.inner.lock().await;
        if !guard.phase.accepts_edits() {
            return Err(ClientError::InvalidState("the evaluation cannot be edited now"));
        }
        let draft = guard
            .roster
            .draft_mut(student_id)
            .ok_or(ClientError::InvalidState("student is not part of this evaluation"))?;
        draft.mark = clamp_mark(mark);
        Ok(draft.mark)
    }

    pub async fn set_comment(
        &self,
        student_id: &StudentId,
        comment: impl Into<String>,
    ) -> Result<(), ClientError> {
        let mut guard = self.inner.lock().await;
        if !guard.phase.accepts_edits() {
            return Err(ClientError::InvalidState("the evaluation cannot be edited now"));
        }
        let draft = guard
            .roster
            .draft_mut(student_id)
            .ok_or(ClientError::InvalidState("student is not part of this evaluation"))?;
        draft.comment = comment.into();
        Ok(())
    }

    /// Sends the whole batch in one request. A failed submission keeps every
    /// draft so the grader can resubmit; a repeat after success is a no-op.
    pub async fn submit(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();
        let (group_id, batch) = {
            let mut guard = self.inner.lock().await;
            match &guard.phase {
                EvaluationPhase::Submitted => return Ok(()),
                EvaluationPhase::Submitting => return Err(ClientError::InFlight),
                EvaluationPhase::FetchingRoster | EvaluationPhase::RosterFailed(_) => {
                    return Err(ClientError::InvalidState("the group to evaluate is not loaded"));
                }
                EvaluationPhase::Editing | EvaluationPhase::SubmitFailed(_) => {}
            }
            let group_id = guard
                .roster
                .group_id
                .clone()
                .ok_or(ClientError::InvalidState("the group to evaluate is not loaded"))?;
            guard.phase = EvaluationPhase::Submitting;
            (group_id, guard.roster.batch())
        };

        let result = self.api.submit_grades(&group_id, &batch).await;
        if !self.scope.is_current(ticket) {
            debug!(%group_id, "dropping submission result for a page that was left");
            let mut guard = self.inner.lock().await;
            if guard.phase == EvaluationPhase::Submitting {
                guard.phase = EvaluationPhase::Editing;
            }
            return Err(ClientError::PageLeft);
        }

        let mut guard = self.inner.lock().await;
        match result {
            Ok(()) => {
                guard.phase = EvaluationPhase::Submitted;
                Ok(())
            }
            Err(err) => {
                warn!(%group_id, error = %err, "grade submission failed");
                guard.phase =
                    EvaluationPhase::SubmitFailed(err.displayed(ErrorContext::EvaluationSubmit));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/evaluation_tests.rs"]
mod tests;
