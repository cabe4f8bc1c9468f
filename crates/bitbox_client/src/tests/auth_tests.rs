use super::*;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bitbox_shared::domain::UserId;
use serde_json::json;

use crate::{
    api::SESSION_COOKIE,
    error::{GENERIC_FAILURE_MESSAGE, INVALID_CODE_MESSAGE, INVALID_CREDENTIALS_MESSAGE},
    session::Identity,
    test_support::{MockBackend, StubResponse},
};

fn session_jwt(sub: &str) -> String {
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": sub, "exp": 4_000_000_000u64}).to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2lnbmF0dXJl")
}

#[tokio::test]
async fn login_routes_to_code_prompt() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/login", StubResponse::status(200).json(json!("mfa-42")))
        .await;
    let auth = AuthController::new(backend.api(), SessionContext::new());

    auth.edit_login(|draft| {
        draft.login = " grader ".to_string();
        draft.password = "S3cret!pass".to_string();
    })
    .await;
    let route = auth.login().await.expect("first factor");

    assert_eq!(route, Route::ValidateCode(MfaCodeId::from("mfa-42")));
    let sent = backend.requests_to("POST", "/auth/login").await;
    assert_eq!(
        sent[0].body,
        Some(json!({"login": "grader", "password": "S3cret!pass"}))
    );
    assert_eq!(auth.login_form().await.draft(), &LoginDraft::default());
}

#[tokio::test]
async fn bad_credentials_keep_the_draft() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/login", StubResponse::status(401))
        .await;
    let auth = AuthController::new(backend.api(), SessionContext::new());

    auth.edit_login(|draft| {
        draft.login = "grader".to_string();
        draft.password = "wrong".to_string();
    })
    .await;
    assert!(auth.login().await.expect_err("rejected").is_unauthorized());

    let form = auth.login_form().await;
    assert!(!form.is_in_flight());
    assert_eq!(form.draft().login, "grader");
    assert_eq!(
        form.error().map(|e| e.message.as_str()),
        Some(INVALID_CREDENTIALS_MESSAGE)
    );
}

#[tokio::test]
async fn empty_login_makes_no_request() {
    let backend = MockBackend::start().await;
    let auth = AuthController::new(backend.api(), SessionContext::new());

    assert!(matches!(
        auth.login().await,
        Err(ClientError::Validation(_))
    ));
    assert!(backend.requests().await.is_empty());
}

#[tokio::test]
async fn code_validation_establishes_identity() {
    let backend = MockBackend::start().await;
    backend
        .stub(
            "POST",
            "/auth/login/code/mfa-42",
            StubResponse::status(200).cookie(format!("token={}; Path=/", session_jwt("teacher-7"))),
        )
        .await;
    let session = SessionContext::new();
    let auth = AuthController::new(backend.api(), session.clone());

    auth.edit_mfa_code(|draft| draft.code = "123456".to_string())
        .await;
    let route = auth
        .validate_code(&MfaCodeId::from("mfa-42"))
        .await
        .expect("second factor");

    assert_eq!(route, Route::Home);
    assert_eq!(session.user_id().await, Some(UserId::from("teacher-7")));
}

#[tokio::test]
async fn accepted_code_without_session_cookie_is_a_failure() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/login/code/m1", StubResponse::status(200))
        .await;
    let session = SessionContext::new();
    let auth = AuthController::new(backend.api(), session.clone());

    auth.edit_mfa_code(|draft| draft.code = "123456".to_string())
        .await;
    let err = auth
        .validate_code(&MfaCodeId::from("m1"))
        .await
        .expect_err("no session cookie");

    assert!(matches!(err, ClientError::UnexpectedResponse { .. }));
    assert_eq!(session.identity().await, None);
    let form = auth.mfa_code_form().await;
    assert!(!form.is_in_flight());
    assert_eq!(form.draft().code, "123456");
    assert_eq!(
        form.error().map(|e| e.message.as_str()),
        Some(GENERIC_FAILURE_MESSAGE)
    );
}

#[tokio::test]
async fn unreadable_session_cookie_is_a_failure() {
    let backend = MockBackend::start().await;
    backend
        .stub(
            "POST",
            "/auth/login/code/m1",
            StubResponse::status(200).cookie("token=not-a-jwt; Path=/"),
        )
        .await;
    let session = SessionContext::new();
    let api = backend.api();
    let auth = AuthController::new(Arc::clone(&api), session.clone());

    auth.edit_mfa_code(|draft| draft.code = "123456".to_string())
        .await;
    assert!(auth.validate_code(&MfaCodeId::from("m1")).await.is_err());
    assert_eq!(session.identity().await, None);
    assert_eq!(api.session_cookie(SESSION_COOKIE).await, None);
}

#[tokio::test]
async fn wrong_code_is_worded_for_the_code_prompt() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/login/code/mfa-42", StubResponse::status(401))
        .await;
    let session = SessionContext::new();
    let auth = AuthController::new(backend.api(), session.clone());

    auth.edit_mfa_code(|draft| draft.code = "000000".to_string())
        .await;
    assert!(auth.validate_code(&MfaCodeId::from("mfa-42")).await.is_err());

    let form = auth.mfa_code_form().await;
    assert_eq!(
        form.error().map(|e| e.message.as_str()),
        Some(INVALID_CODE_MESSAGE)
    );
    assert_eq!(session.identity().await, None);
}

#[tokio::test]
async fn register_checks_passwords_before_sending() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/register", StubResponse::status(201).json(json!("user-1")))
        .await;
    let auth = AuthController::new(backend.api(), SessionContext::new());

    auth.edit_register(|draft| {
        draft.username = "grader".to_string();
        draft.email = "grader@example.com".to_string();
        draft.password = "S3cret!pass".to_string();
        draft.confirm_password = "different".to_string();
    })
    .await;
    assert!(auth.register().await.is_err());
    assert!(backend.requests().await.is_empty());

    auth.edit_register(|draft| draft.confirm_password = "S3cret!pass".to_string())
        .await;
    assert_eq!(auth.register().await.expect("registered"), Route::Home);
    let sent = backend.requests_to("POST", "/auth/register").await;
    assert_eq!(
        sent[0].body,
        Some(json!({
            "username": "grader",
            "email": "grader@example.com",
            "password": "S3cret!pass"
        }))
    );
}

#[tokio::test]
async fn logout_clears_identity_even_when_backend_fails() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/logout", StubResponse::status(500))
        .await;
    let session = SessionContext::with_identity(Identity {
        user_id: UserId::from("teacher-7"),
    });
    let auth = AuthController::new(backend.api(), session.clone());

    assert_eq!(auth.logout().await, Route::Login);
    assert_eq!(session.identity().await, None);
    assert_eq!(backend.requests_to("POST", "/auth/logout").await.len(), 1);
}
