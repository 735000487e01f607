use axum::Json;
use http::StatusCode;
use lbd_auth::ProfileError;
use serde_json::{Map, Value, json};

/// Error half of every API handler: status plus `{"error": ..., ...details}`
pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn error_body(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "error": message.into() }))
}

/// Helper trait for converting errors to the API's JSON error responses
pub trait IntoResponseError<T> {
    /// `failure` is reported instead of internal error details
    fn into_response_error(self, failure: &str) -> Result<T, ApiError>;
}

impl<T> IntoResponseError<T> for Result<T, ProfileError> {
    fn into_response_error(self, failure: &str) -> Result<T, ApiError> {
        self.map_err(|e| match e {
            ProfileError::NotFound => (StatusCode::NOT_FOUND, error_body(e.to_string())),
            ProfileError::AlreadyExists(onboarding) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "User already exists", "onboarding": onboarding })),
            ),
            ProfileError::Validation { message, details } => {
                let mut body = Map::new();
                body.insert("error".to_string(), Value::String(message));
                for (key, values) in details {
                    body.insert(key.to_string(), json!(values));
                }
                (StatusCode::BAD_REQUEST, Json(Value::Object(body)))
            }
            ProfileError::Conflict(_) => (StatusCode::CONFLICT, error_body(e.to_string())),
            ProfileError::Storage(_) | ProfileError::InvalidData(_) => {
                tracing::error!(error = %e, "{}", failure);
                (StatusCode::INTERNAL_SERVER_ERROR, error_body(failure))
            }
        })
    }
}
