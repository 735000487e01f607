//! Central configuration for the lbd_auth_axum crate

use std::sync::LazyLock;

/// Mount point of the API router
/// Default: "/api"
pub static LBD_API_PREFIX: LazyLock<String> =
    LazyLock::new(|| std::env::var("LBD_API_PREFIX").unwrap_or_else(|_| "/api".to_string()));

/// Origins allowed by CORS, comma separated
/// Default: "http://localhost:5173"
pub static ALLOWED_ORIGINS: LazyLock<Vec<String>> = LazyLock::new(|| {
    parse_origins(std::env::var("ALLOWED_ORIGINS").ok().as_deref())
});

/// Reported by the health route
/// Default: "development"
pub static LBD_ENVIRONMENT: LazyLock<String> = LazyLock::new(|| {
    std::env::var("LBD_ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
});

fn parse_origins(value: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        vec!["http://localhost:5173".to_string()]
    } else {
        origins
    }
}
