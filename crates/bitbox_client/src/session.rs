use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bitbox_shared::domain::UserId;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
}

/// Who is signed in, filled once when the session is established and handed
/// to every controller that needs it.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    identity: Arc<RwLock<Option<Identity>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity: Arc::new(RwLock::new(Some(identity))),
        }
    }

    pub async fn establish(&self, identity: Identity) {
        *self.identity.write().await = Some(identity);
    }

    pub async fn clear(&self) {
        *self.identity.write().await = None;
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.identity.read().await.clone()
    }

    pub async fn user_id(&self) -> Option<UserId> {
        self.identity
            .read()
            .await
            .as_ref()
            .map(|identity| identity.user_id.clone())
    }
}

/// Reads the `sub` claim of the session JWT. The signature is the backend's
/// business; only the payload segment is decoded.
pub fn identity_from_session_token(token: &str) -> Result<Identity, ClientError> {
    let malformed = |reason: String| ClientError::UnexpectedResponse {
        path: "session cookie".to_string(),
        reason,
    };

    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| malformed("session token is not a JWT".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| malformed(format!("invalid token payload encoding: {err}")))?;
    let claims: SessionClaims = serde_json::from_slice(&bytes)
        .map_err(|err| malformed(format!("invalid token claims: {err}")))?;

    Ok(Identity {
        user_id: UserId(claims.sub),
    })
}
