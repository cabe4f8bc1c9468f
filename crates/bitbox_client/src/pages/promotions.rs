use std::sync::Arc;

use bitbox_shared::{domain::PromotionId, models::Promotion};
use tokio::sync::Mutex;
use tracing::info;

use super::{confirm, ensure_current, settle_load};
use crate::{
    api::ApiClient,
    collection::{EntityCollection, LoadStatus},
    error::{ClientError, ErrorContext},
    forms::{FormController, PromotionDraft},
    scope::PageScope,
    session::SessionContext,
};

#[derive(Default)]
struct PromotionsState {
    status: LoadStatus,
    promotions: EntityCollection<Promotion>,
    create: FormController<PromotionDraft>,
}

/// Landing page: the signed-in teacher's promotions.
pub struct PromotionsPage {
    api: Arc<ApiClient>,
    session: SessionContext,
    scope: PageScope,
    state: Mutex<PromotionsState>,
}

impl PromotionsPage {
    pub fn new(api: Arc<ApiClient>, session: SessionContext) -> Self {
        Self {
            api,
            session,
            scope: PageScope::new(),
            state: Mutex::new(PromotionsState::default()),
        }
    }

    pub fn leave(&self) {
        self.scope.leave();
    }

    pub async fn load(&self) -> Result<(), ClientError> {
        let ticket = self.scope.ticket();
        let result = self.api.list_promotions().await;
        ensure_current(&self.scope, ticket, "promotions")?;

        let mut state = self.state.lock().await;
        let promotions = settle_load(&mut state.status, result, "promotions")?;
        state.promotions.reset(promotions);
        Ok(())
    }

    pub async fn status(&self) -> LoadStatus {
        self.state.lock().await.status.clone()
    }

    pub async fn promotions(&self) -> Vec<Promotion> {
        self.state.lock().await.promotions.items().to_vec()
    }

    pub async fn open_create(&self) {
        self.state.lock().await.create.open();
    }

    pub async fn close_create(&self) {
        self.state.lock().await.create.close();
    }

    pub async fn edit_create(&self, f: impl FnOnce(&mut PromotionDraft)) {
        self.state.lock().await.create.edit(f);
    }

    pub async fn create_form(&self) -> FormController<PromotionDraft> {
        self.state.lock().await.create.clone()
    }

    /// Creates a promotion owned by the signed-in teacher and lists it once
    /// the backend has assigned its id.
    pub async fn create_promotion(&self) -> Result<PromotionId, ClientError> {
        let ticket = self.scope.ticket();
        let (teacher_id, body) = {
            let mut state = self.state.lock().await;
            if state.create.is_in_flight() {
                return Err(ClientError::InFlight);
            }
            let Some(teacher_id) = self.session.user_id().await else {
                let err = ClientError::InvalidState("no teacher is signed in");
                state.create.fail(&err, ErrorContext::General);
                return Err(err);
            };
            (teacher_id, state.create.begin_submit()?)
        };

        let result = self.api.create_promotion(&body).await;
        let mut state = self.state.lock().await;
        let id = confirm(
            &self.scope,
            ticket,
            &mut state.create,
            result,
            ErrorContext::General,
            "promotion creation",
        )?;
        state.promotions.append(Promotion {
            id: id.clone(),
            title: body.title,
            start_year: body.start_year,
            end_year: body.end_year,
            teacher_id,
        });
        state.create.succeed();
        info!(promotion_id = %id, "promotion created");
        Ok(id)
    }
}
