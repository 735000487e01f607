//! Axum mock of the identity toolkit REST API
//!
//! Google sign-ins succeed; GitHub sign-ins collide with the Google account
//! unless GitHub has already been linked to it.

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

use super::fixtures::EMAIL;

#[derive(Default)]
pub struct MockState {
    /// `accounts:*` method names in call order
    pub calls: Vec<String>,
    pub github_linked: bool,
    /// Error code returned by the next linking call
    pub link_error: Option<String>,
    pub signin_methods: Vec<String>,
}

#[derive(Clone)]
pub struct MockToolkit {
    pub base_url: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockToolkit {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState {
            signin_methods: vec!["google.com".to_string()],
            ..Default::default()
        }));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            state,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

fn toolkit_error(code: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": {"code": 400, "message": code}})),
    )
        .into_response()
}

async fn handle(State(state): State<Arc<Mutex<MockState>>>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let has_key = request
        .uri()
        .query()
        .is_some_and(|q| q.contains("key=test-key"));
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    if !has_key {
        return toolkit_error("API_KEY_INVALID");
    }

    let Some(method) = path.strip_prefix("/v1/accounts:") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut state = state.lock().unwrap();
    state.calls.push(method.to_string());

    match method {
        "signInWithIdp" => {
            let post_body = body["postBody"].as_str().unwrap_or_default();
            let linking = body.get("idToken").is_some();

            if linking {
                if let Some(code) = state.link_error.take() {
                    return toolkit_error(&code);
                }
                state.github_linked = true;
                return Json(json!({"localId": "uid-google", "idToken": "tok-linked"})).into_response();
            }

            if post_body.contains("providerId=github.com") && !state.github_linked {
                return Json(json!({
                    "needConfirmation": true,
                    "email": EMAIL,
                    "verifiedProvider": ["google.com"],
                }))
                .into_response();
            }

            Json(json!({
                "localId": "uid-google",
                "email": EMAIL,
                "displayName": "Test User",
                "idToken": "tok-google",
            }))
            .into_response()
        }
        "lookup" => {
            let mut providers = vec![json!({"providerId": "google.com"})];
            if state.github_linked {
                providers.push(json!({"providerId": "github.com"}));
            }
            Json(json!({
                "users": [{
                    "localId": "uid-google",
                    "email": EMAIL,
                    "displayName": "Test User",
                    "providerUserInfo": providers,
                }]
            }))
            .into_response()
        }
        "createAuthUri" => Json(json!({
            "registered": true,
            "signinMethods": state.signin_methods,
        }))
        .into_response(),
        _ => toolkit_error("INVALID_METHOD"),
    }
}
