use std::{env, sync::LazyLock};

/// Base URL of the identity toolkit REST API
pub(crate) static LBD_IDENTITY_TOOLKIT_URL: LazyLock<String> =
    LazyLock::new(|| toolkit_url(env::var("LBD_IDENTITY_TOOLKIT_URL").ok().as_deref()));

/// Request URI reported to the identity toolkit for IdP sign-ins
pub(crate) static LBD_AUTH_REQUEST_URI: LazyLock<String> = LazyLock::new(|| {
    env::var("LBD_AUTH_REQUEST_URI").unwrap_or_else(|_| "http://localhost".to_string())
});

/// Project id; the audience of every ID token the server accepts
pub(crate) static FIREBASE_PROJECT_ID: LazyLock<Option<String>> =
    LazyLock::new(|| project_id(env::var("FIREBASE_PROJECT_ID").ok().as_deref()));

/// JWKS endpoint for ID-token signing keys
pub(crate) static LBD_TOKEN_JWKS_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("LBD_TOKEN_JWKS_URL").unwrap_or_else(|_| {
        "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
            .to_string()
    })
});

/// Issuer prefix; the project id is appended
pub(crate) const TOKEN_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

fn toolkit_url(value: Option<&str>) -> String {
    value
        .map(|url| url.trim_end_matches('/'))
        .filter(|url| !url.is_empty())
        .unwrap_or("https://identitytoolkit.googleapis.com/v1")
        .to_string()
}

fn project_id(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
