use bitbox_shared::error::{DisplayedError, FailureKind, ValidationError};
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred. Please try again later.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password. Please try again.";
pub const INVALID_CODE_MESSAGE: &str = "Invalid or expired code. Please try again.";
pub const SUBMISSION_FAILURE_MESSAGE: &str =
    "An error occurred during submission. Please try again later.";
pub const GROUP_MARK_FAILURE_MESSAGE: &str = "Failed to update the mark. Please try again.";
pub const IN_FLIGHT_MESSAGE: &str = "A submission is already in progress.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {path} was rejected as unauthorized")]
    Unauthorized { method: String, path: String },
    #[error("{method} {path} returned unexpected status {status}")]
    Status {
        method: String,
        path: String,
        status: u16,
    },
    #[error("unexpected response body from {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in flight")]
    InFlight,
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("response arrived after the page was left")]
    PageLeft,
    #[error("invalid api url: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Where a failure is rendered; a few flows word some failures differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    General,
    Login,
    MfaCode,
    Register,
    EvaluationSubmit,
    GroupMark,
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Unauthorized { .. } => FailureKind::Unauthorized,
            ClientError::UnexpectedResponse { .. } => FailureKind::UnexpectedResponse,
            ClientError::Validation(_) | ClientError::InvalidState(_) | ClientError::InFlight => {
                FailureKind::Validation
            }
            ClientError::Transport { .. }
            | ClientError::Status { .. }
            | ClientError::PageLeft
            | ClientError::InvalidBaseUrl(_)
            | ClientError::HttpClient(_) => FailureKind::Transport,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    pub fn displayed(&self, context: ErrorContext) -> DisplayedError {
        let kind = self.kind();
        let message = match (self, context) {
            (ClientError::Validation(err), _) => err.to_string(),
            (ClientError::InvalidState(reason), _) => (*reason).to_string(),
            (ClientError::InFlight, _) => IN_FLIGHT_MESSAGE.to_string(),
            (ClientError::Unauthorized { .. }, ErrorContext::Login) => {
                INVALID_CREDENTIALS_MESSAGE.to_string()
            }
            (ClientError::Unauthorized { .. }, ErrorContext::MfaCode) => {
                INVALID_CODE_MESSAGE.to_string()
            }
            (_, ErrorContext::EvaluationSubmit) => SUBMISSION_FAILURE_MESSAGE.to_string(),
            (_, ErrorContext::GroupMark) => GROUP_MARK_FAILURE_MESSAGE.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        };
        DisplayedError::new(kind, message)
    }
}
