use super::*;

use bitbox_shared::error::FailureKind;
use serde_json::json;

use crate::test_support::{MockBackend, StubResponse};

fn promotion_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": "promo",
        "start_year": "2024-09-01",
        "end_year": "2025-06-30",
        "teacher_id": "teacher-1"
    })
}

#[tokio::test]
async fn list_promotions_parses_array_payload() {
    let backend = MockBackend::start().await;
    backend
        .stub(
            "GET",
            "/promotions/",
            StubResponse::status(200).json(json!([promotion_json("p1"), promotion_json("p2")])),
        )
        .await;

    let promotions = backend.api().list_promotions().await.expect("promotions");
    assert_eq!(promotions.len(), 2);
    assert_eq!(promotions[1].id, PromotionId::from("p2"));
}

#[tokio::test]
async fn create_requires_created_status() {
    let backend = MockBackend::start().await;
    backend
        .stub(
            "POST",
            "/promotions/",
            StubResponse::status(200).json(json!("abc123")),
        )
        .await;

    let body = NewPromotionPostModel {
        title: "Promo 2025".to_string(),
        start_year: "2025-01-01".parse().expect("date"),
        end_year: "2025-12-31".parse().expect("date"),
    };
    let err = backend
        .api()
        .create_promotion(&body)
        .await
        .expect_err("200 is not a creation");
    assert!(matches!(err, ClientError::Status { status: 200, .. }));

    let sent = backend.requests_to("POST", "/promotions/").await;
    assert_eq!(
        sent[0].body,
        Some(json!({"title": "Promo 2025", "start_year": "2025-01-01", "end_year": "2025-12-31"}))
    );
}

#[tokio::test]
async fn unauthorized_is_reported_distinctly() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/login", StubResponse::status(401))
        .await;

    let err = backend
        .api()
        .login(&LoginUserPostModel {
            login: "grader".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .expect_err("must fail");
    assert!(err.is_unauthorized());
    assert_eq!(err.kind(), FailureKind::Unauthorized);
}

#[tokio::test]
async fn mismatched_body_is_not_accepted() {
    let backend = MockBackend::start().await;
    backend
        .stub(
            "GET",
            "/groups/project/p1",
            StubResponse::status(200).json(json!([{"unexpected": true}])),
        )
        .await;

    let err = backend
        .api()
        .list_groups(&ProjectId::from("p1"))
        .await
        .expect_err("shape mismatch");
    assert!(matches!(err, ClientError::UnexpectedResponse { .. }));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    let api = ApiClient::with_base_url("http://127.0.0.1:9/api").expect("api");
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");

    let err = api.list_promotions().await.expect_err("nothing listens");
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn evaluation_token_is_sent_as_query_parameter() {
    let backend = MockBackend::start().await;
    backend
        .stub("GET", "/token/evaluation", StubResponse::status(200))
        .await;

    backend
        .api()
        .resolve_evaluation_token(&EvaluationTokenId::from("tok en/1"))
        .await
        .expect("resolved");

    let sent = backend.requests_to("GET", "/token/evaluation").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].query.as_deref(), Some("id=tok+en%2F1"));
}

#[tokio::test]
async fn ids_are_encoded_as_single_path_segments() {
    let backend = MockBackend::start().await;
    backend
        .stub("DELETE", "/students/a%2Fb", StubResponse::status(200))
        .await;

    backend
        .api()
        .delete_student(&StudentId::from("a/b"))
        .await
        .expect("deleted");
    assert_eq!(backend.requests_to("DELETE", "/students/a%2Fb").await.len(), 1);
}

#[tokio::test]
async fn assign_students_sends_plain_id_array() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/groups/g1/students", StubResponse::status(200))
        .await;

    backend
        .api()
        .assign_students(
            &GroupId::from("g1"),
            &[StudentId::from("s1"), StudentId::from("s2")],
        )
        .await
        .expect("assigned");

    let sent = backend.requests_to("POST", "/groups/g1/students").await;
    assert_eq!(sent[0].body, Some(json!(["s1", "s2"])));
}

#[tokio::test]
async fn session_cookie_is_sent_back_and_cleared() {
    let backend = MockBackend::start().await;
    backend
        .stub(
            "POST",
            "/auth/login/code/mfa-1",
            StubResponse::status(200).cookie("token=session-value; Path=/"),
        )
        .await;
    backend
        .stub("GET", "/promotions/", StubResponse::status(200).json(json!([])))
        .await;

    let api = backend.api();
    api.validate_mfa_code(
        &MfaCodeId::from("mfa-1"),
        &MfaCodePostModel {
            code: "123456".to_string(),
        },
    )
    .await
    .expect("validated");
    assert_eq!(
        api.session_cookie(SESSION_COOKIE).await.as_deref(),
        Some("session-value")
    );

    api.list_promotions().await.expect("list with cookie");
    api.clear_session().await.expect("clear");
    assert_eq!(api.session_cookie(SESSION_COOKIE).await, None);
    api.list_promotions().await.expect("list without cookie");

    let sent = backend.requests_to("GET", "/promotions/").await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].cookie.as_deref(), Some("token=session-value"));
    assert_eq!(sent[1].cookie, None);
}

#[tokio::test]
async fn register_accepts_any_success_status() {
    let backend = MockBackend::start().await;
    backend
        .stub("POST", "/auth/register", StubResponse::status(201).json(json!("user-1")))
        .await;

    backend
        .api()
        .register(&RegisterUserPostModel {
            username: "grader".to_string(),
            email: "grader@example.com".to_string(),
            password: "S3cret!pass".to_string(),
        })
        .await
        .expect("registered");
}
