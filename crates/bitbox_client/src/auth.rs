use std::sync::Arc;

use bitbox_shared::domain::MfaCodeId;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    api::{ApiClient, SESSION_COOKIE},
    error::{ClientError, ErrorContext},
    forms::{FormController, LoginDraft, MfaCodeDraft, RegisterDraft},
    route::Route,
    session::{identity_from_session_token, SessionContext},
};

#[derive(Default)]
struct AuthForms {
    login: FormController<LoginDraft>,
    mfa_code: FormController<MfaCodeDraft>,
    register: FormController<RegisterDraft>,
}

/// Login with second factor, registration and logout.
pub struct AuthController {
    api: Arc<ApiClient>,
    session: SessionContext,
    forms: Mutex<AuthForms>,
}

impl AuthController {
    pub fn new(api: Arc<ApiClient>, session: SessionContext) -> Self {
        Self {
            api,
            session,
            forms: Mutex::new(AuthForms::default()),
        }
    }

    pub async fn edit_login(&self, f: impl FnOnce(&mut LoginDraft)) {
        self.forms.lock().await.login.edit(f);
    }

    pub async fn edit_mfa_code(&self, f: impl FnOnce(&mut MfaCodeDraft)) {
        self.forms.lock().await.mfa_code.edit(f);
    }

    pub async fn edit_register(&self, f: impl FnOnce(&mut RegisterDraft)) {
        self.forms.lock().await.register.edit(f);
    }

    pub async fn login_form(&self) -> FormController<LoginDraft> {
        self.forms.lock().await.login.clone()
    }

    pub async fn mfa_code_form(&self) -> FormController<MfaCodeDraft> {
        self.forms.lock().await.mfa_code.clone()
    }

    pub async fn register_form(&self) -> FormController<RegisterDraft> {
        self.forms.lock().await.register.clone()
    }

    /// First factor. On success the caller is sent to the code prompt.
    pub async fn login(&self) -> Result<Route, ClientError> {
        let body = self.forms.lock().await.login.begin_submit()?;

        let result = self.api.login(&body).await;
        let mut forms = self.forms.lock().await;
        match result {
            Ok(mfa_code_id) => {
                forms.login.succeed();
                info!(login = %body.login, "credentials accepted, waiting for second factor");
                Ok(Route::ValidateCode(mfa_code_id))
            }
            Err(err) => {
                forms.login.fail(&err, ErrorContext::Login);
                Err(err)
            }
        }
    }

    /// Second factor. The backend answers with the session cookie, whose
    /// subject becomes the signed-in identity.
    pub async fn validate_code(&self, mfa_code_id: &MfaCodeId) -> Result<Route, ClientError> {
        let body = self.forms.lock().await.mfa_code.begin_submit()?;

        let result = match self.api.validate_mfa_code(mfa_code_id, &body).await {
            Ok(()) => self.establish_identity().await,
            Err(err) => Err(err),
        };

        let mut forms = self.forms.lock().await;
        match result {
            Ok(()) => {
                forms.mfa_code.succeed();
                Ok(Route::Home)
            }
            Err(err) => {
                forms.mfa_code.fail(&err, ErrorContext::MfaCode);
                Err(err)
            }
        }
    }

    pub async fn register(&self) -> Result<Route, ClientError> {
        let body = self.forms.lock().await.register.begin_submit()?;

        let result = self.api.register(&body).await;
        let mut forms = self.forms.lock().await;
        match result {
            Ok(()) => {
                forms.register.succeed();
                info!(username = %body.username, "account registered");
                Ok(Route::Home)
            }
            Err(err) => {
                forms.register.fail(&err, ErrorContext::Register);
                Err(err)
            }
        }
    }

    /// Ends the session locally even when the backend call fails.
    pub async fn logout(&self) -> Route {
        if let Err(err) = self.api.logout().await {
            warn!(error = %err, "logout request failed, dropping the local session anyway");
        }
        if let Err(err) = self.api.clear_session().await {
            warn!(error = %err, "could not reset the cookie session");
        }
        self.session.clear().await;
        Route::Login
    }

    /// Fails, and resets the cookie session, when the accepted code came back
    /// without a readable session cookie.
    async fn establish_identity(&self) -> Result<(), ClientError> {
        let identity = match self.api.session_cookie(SESSION_COOKIE).await {
            Some(token) => identity_from_session_token(&token),
            None => Err(ClientError::UnexpectedResponse {
                path: "session cookie".to_string(),
                reason: format!("no `{SESSION_COOKIE}` cookie was set"),
            }),
        };

        match identity {
            Ok(identity) => {
                info!(user_id = %identity.user_id, "signed in");
                self.session.establish(identity).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "second factor accepted without a usable session");
                if let Err(clear_err) = self.api.clear_session().await {
                    warn!(error = %clear_err, "could not reset the cookie session");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
