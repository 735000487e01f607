//! Combined router for the API endpoints

use axum::{Json, Router, extract::OriginalUri};
use http::{HeaderValue, Method, StatusCode, header};
use serde_json::{Value, json};
use tower_http::LatencyUnit;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::config::ALLOWED_ORIGINS;
use super::session::ApiState;

/// Create the API router, to be mounted at `LBD_API_PREFIX`
///
/// - `/health`
/// - `/onboarding/...`
///
/// Unknown paths under the mount point answer with a JSON 404.
pub fn lbd_api_router(state: ApiState) -> Router {
    lbd_api_router_no_trace(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as `lbd_api_router()` but without the HTTP tracing middleware
pub fn lbd_api_router_no_trace(state: ApiState) -> Router {
    Router::new()
        .merge(super::health::router())
        .nest("/onboarding", super::onboarding::router())
        .fallback(api_not_found)
        .with_state(state)
        .layer(cors_layer(&ALLOWED_ORIGINS))
}

async fn api_not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    tracing::debug!(path = %uri.path(), "API route not found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "API route not found", "path": uri.path() })),
    )
}

/// Credentialed CORS for the listed origins
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
