use std::{env, str::FromStr, sync::LazyLock};
use tokio::sync::Mutex;

use super::types::{DataStore, PostgresDataStore, SqliteDataStore};

static GENERIC_DATA_STORE_TYPE: LazyLock<String> = LazyLock::new(|| {
    env::var("GENERIC_DATA_STORE_TYPE").expect("GENERIC_DATA_STORE_TYPE must be set")
});

static GENERIC_DATA_STORE_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("GENERIC_DATA_STORE_URL").expect("GENERIC_DATA_STORE_URL must be set")
});

pub(crate) static GENERIC_DATA_STORE: LazyLock<Mutex<Box<dyn DataStore>>> = LazyLock::new(|| {
    let store_type = GENERIC_DATA_STORE_TYPE.as_str();
    tracing::info!(store_type, "Initializing data store");

    match build_store(store_type, GENERIC_DATA_STORE_URL.as_str()) {
        Ok(store) => Mutex::new(store),
        Err(e) => panic!("{e}"),
    }
});

/// Table prefix from environment variable
pub(crate) static DB_TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| table_prefix(env::var("DB_TABLE_PREFIX").ok().as_deref()));

/// Lazily connected pool for `store_type`
fn build_store(store_type: &str, store_url: &str) -> Result<Box<dyn DataStore>, String> {
    match store_type {
        "sqlite" => {
            let opts = sqlx::sqlite::SqliteConnectOptions::from_str(store_url)
                .map_err(|e| format!("Failed to parse SQLite connection string: {e}"))?
                .create_if_missing(true);
            Ok(Box::new(SqliteDataStore {
                pool: sqlx::sqlite::SqlitePool::connect_lazy_with(opts),
            }))
        }
        "postgres" => {
            let pool = sqlx::PgPool::connect_lazy(store_url)
                .map_err(|e| format!("Failed to create Postgres pool: {e}"))?;
            Ok(Box::new(PostgresDataStore { pool }))
        }
        t => Err(format!(
            "Unsupported store type: {t}. Supported types are 'sqlite' and 'postgres'"
        )),
    }
}

fn table_prefix(value: Option<&str>) -> String {
    value.unwrap_or("lbd_").to_string()
}
