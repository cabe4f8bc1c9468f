use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request never completed, or the server answered with a non-2xx status.
    Transport,
    /// The server answered 401.
    Unauthorized,
    /// A client-side pre-check rejected the input before any request.
    Validation,
    /// The server answered 2xx but the body did not have the expected shape.
    UnexpectedResponse,
}

/// Inline message shown next to the control that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedError {
    pub kind: FailureKind,
    pub message: String,
}

impl DisplayedError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("{field} is not a valid number")]
    NotANumber { field: &'static str },
    #[error("{field} is not a valid date")]
    InvalidDate { field: &'static str },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("the passwords don't match")]
    PasswordMismatch,
    #[error("student {student_id} cannot be added to this group")]
    StudentNotSelectable { student_id: String },
}

impl ValidationError {
    pub fn displayed(&self) -> DisplayedError {
        DisplayedError::new(FailureKind::Validation, self.to_string())
    }
}
