use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(PromotionId);
id_newtype!(ProjectId);
id_newtype!(StudentId);
id_newtype!(GroupId);
id_newtype!(MfaCodeId);
id_newtype!(EvaluationTokenId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProjectState {
    NotStarted,
    InProgress,
    Finished,
    NotationFinished,
}

impl ProjectState {
    /// Group marks can only be edited once the project itself is over.
    pub fn allows_mark_edit(self) -> bool {
        self == ProjectState::Finished
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProjectState::NotStarted => "not started",
            ProjectState::InProgress => "in progress",
            ProjectState::Finished => "finished",
            ProjectState::NotationFinished => "notation finished",
        };
        f.write_str(label)
    }
}

/// Anything held in a local collection is matched by its backend id.
pub trait Identified {
    type Id: PartialEq + Clone + fmt::Debug;

    fn id(&self) -> &Self::Id;
}
