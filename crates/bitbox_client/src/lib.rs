//! Client library for the Bitbox grading backend.
//!
//! Controllers own their page state behind a mutex and only splice backend
//! results into it after the server has confirmed them.

pub mod api;
pub mod auth;
pub mod collection;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod forms;
pub mod pages;
pub mod route;
pub mod scope;
pub mod session;

pub use api::ApiClient;
pub use auth::AuthController;
pub use collection::{EntityCollection, LoadStatus};
pub use config::{load_settings, ClientSettings};
pub use error::{ClientError, ErrorContext};
pub use evaluation::{EvaluationForm, EvaluationPhase, TokenResolver, TokenState};
pub use forms::FormController;
pub use pages::{ProjectPage, PromotionPage, PromotionsPage, StudentMarksPage};
pub use route::Route;
pub use scope::PageScope;
pub use session::{Identity, SessionContext};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
