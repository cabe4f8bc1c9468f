//! Page controllers for the teacher-facing screens.
//!
//! A page owns the collections it shows and the forms that change them. Backend
//! answers are only spliced in while the page is still mounted.

mod project;
mod promotion;
mod promotions;
mod student_marks;

pub use project::{ProjectPage, ProjectSnapshot};
pub use promotion::{PromotionPage, PromotionSnapshot};
pub use promotions::PromotionsPage;
pub use student_marks::StudentMarksPage;

use tracing::{debug, warn};

use crate::{
    collection::LoadStatus,
    error::{ClientError, ErrorContext},
    forms::{Draft, FormController},
    scope::{PageScope, ScopeTicket},
};

fn ensure_current(scope: &PageScope, ticket: ScopeTicket, what: &'static str) -> Result<(), ClientError> {
    if scope.is_current(ticket) {
        return Ok(());
    }
    debug!(what, "dropping response for a page that was left");
    Err(ClientError::PageLeft)
}

/// Records how a load ended and hands the payload back on success.
fn settle_load<T>(
    status: &mut LoadStatus,
    result: Result<T, ClientError>,
    what: &'static str,
) -> Result<T, ClientError> {
    match result {
        Ok(payload) => {
            *status = LoadStatus::Loaded;
            Ok(payload)
        }
        Err(err) => {
            warn!(what, error = %err, "load failed");
            *status = LoadStatus::Failed(err.displayed(ErrorContext::General));
            Err(err)
        }
    }
}

/// Settles one backend step of a form submission. A failure is stored on the
/// form; success leaves the form in flight for the caller to finish.
fn confirm<D: Draft, T>(
    scope: &PageScope,
    ticket: ScopeTicket,
    form: &mut FormController<D>,
    result: Result<T, ClientError>,
    context: ErrorContext,
    what: &'static str,
) -> Result<T, ClientError> {
    if let Err(err) = ensure_current(scope, ticket, what) {
        form.abandon();
        return Err(err);
    }
    result.map_err(|err| {
        warn!(what, error = %err, "submission failed");
        form.fail(&err, context);
        err
    })
}

#[cfg(test)]
#[path = "../tests/pages_tests.rs"]
mod tests;
