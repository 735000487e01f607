use std::{env, sync::LazyLock};

use crate::storage::DB_TABLE_PREFIX;

/// Profiles table name
pub(crate) static DB_TABLE_PROFILES: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_PROFILES").unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "profiles"))
});
