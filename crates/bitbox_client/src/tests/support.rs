//! In-process stand-in for the Bitbox backend.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::{Mutex, Notify},
};

use crate::api::ApiClient;

#[derive(Clone)]
pub(crate) struct StubResponse {
    status: u16,
    body: Option<Value>,
    set_cookie: Option<String>,
    gate: Option<Arc<Notify>>,
}

impl StubResponse {
    pub(crate) fn status(status: u16) -> Self {
        Self {
            status,
            body: None,
            set_cookie: None,
            gate: None,
        }
    }

    pub(crate) fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn cookie(mut self, set_cookie: impl Into<String>) -> Self {
        self.set_cookie = Some(set_cookie.into());
        self
    }

    /// Holds the response until the gate is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
    pub cookie: Option<String>,
}

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<Mutex<HashMap<(String, String), StubResponse>>>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub(crate) struct MockBackend {
    pub base_url: String,
    state: MockState,
}

pub(crate) const API_PREFIX: &str = "/api";

impl MockBackend {
    pub(crate) async fn start() -> Self {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        let state = MockState::default();
        let app = Router::new()
            .fallback(handle_request)
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}{API_PREFIX}"),
            state,
        }
    }

    pub(crate) fn api(&self) -> Arc<ApiClient> {
        Arc::new(ApiClient::with_base_url(&self.base_url).expect("api client"))
    }

    /// Registers the answer for `method` on `path` (path without the `/api` prefix).
    pub(crate) async fn stub(&self, method: &str, path: &str, response: StubResponse) {
        self.state.routes.lock().await.insert(
            (method.to_string(), format!("{API_PREFIX}{path}")),
            response,
        );
    }

    pub(crate) async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.recorded.lock().await.clone()
    }

    pub(crate) async fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        let full_path = format!("{API_PREFIX}{path}");
        self.requests()
            .await
            .into_iter()
            .filter(|request| request.method == method && request.path == full_path)
            .collect()
    }
}

async fn handle_request(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let stub = state
        .routes
        .lock()
        .await
        .get(&(method.clone(), path.clone()))
        .cloned();

    state.recorded.lock().await.push(RecordedRequest {
        method,
        path,
        query: parts.uri.query().map(str::to_string),
        body: serde_json::from_slice(&bytes).ok(),
        cookie: parts
            .headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    });

    let Some(stub) = stub else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(gate) = &stub.gate {
        gate.notified().await;
    }

    let mut response = match stub.body {
        Some(body) => Json(body).into_response(),
        None => ().into_response(),
    };
    *response.status_mut() = StatusCode::from_u16(stub.status).expect("valid status");
    if let Some(cookie) = stub.set_cookie {
        response.headers_mut().insert(
            header::SET_COOKIE,
            HeaderValue::from_str(&cookie).expect("valid cookie header"),
        );
    }
    response
}
