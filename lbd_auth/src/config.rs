//! Central configuration for the lbd_auth crate

use std::sync::LazyLock;

/// Provider retried when a collision names no existing provider at all
///
/// Default: "google.com"
pub static LBD_DEFAULT_EXISTING_PROVIDER: LazyLock<String> = LazyLock::new(|| {
    default_existing_provider(std::env::var("LBD_DEFAULT_EXISTING_PROVIDER").ok().as_deref())
});

fn default_existing_provider(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("google.com")
        .to_string()
}
