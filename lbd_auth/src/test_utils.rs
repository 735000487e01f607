//! Shared setup for tests that touch the data store

use std::sync::Once;

/// Load `.env_test` once, start from an empty sqlite file and create the tables.
pub async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }
        set_default_env("GENERIC_DATA_STORE_TYPE", "sqlite");
        set_default_env("GENERIC_DATA_STORE_URL", "sqlite:/tmp/lbd_auth_test.db");

        if let Some(db_path) = std::env::var("GENERIC_DATA_STORE_URL")
            .ok()
            .and_then(|url| sqlite_file_path(&url))
        {
            let _ = std::fs::remove_file(db_path);
        }
    });

    if let Err(e) = crate::profile::ProfileStore::init().await {
        eprintln!("Warning: Failed to initialize ProfileStore: {e}");
    }
}

fn set_default_env(key: &str, value: &str) {
    if std::env::var(key).is_err() {
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

/// File behind a `sqlite:` URL; `None` for in-memory or non-sqlite URLs
fn sqlite_file_path(url: &str) -> Option<String> {
    let path = url.strip_prefix("sqlite:")?;
    let path = path.strip_prefix("file:").unwrap_or(path);
    let path = path.strip_prefix("//").unwrap_or(path);
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite:/tmp/test.db"),
            Some("/tmp/test.db".to_string())
        );
        assert_eq!(
            sqlite_file_path("sqlite:./test.db"),
            Some("./test.db".to_string())
        );
        assert_eq!(
            sqlite_file_path("sqlite:file:/tmp/test.db?mode=rwc"),
            Some("/tmp/test.db".to_string())
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgresql://localhost/db"), None);
    }
}
