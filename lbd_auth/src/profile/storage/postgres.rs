use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::config::DB_TABLE_PROFILES;
use crate::profile::{errors::ProfileError, types::ProfileDocument};
use crate::storage::validate_postgres_table_schema;

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), ProfileError> {
    let table_name = DB_TABLE_PROFILES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            account_id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL,
            document TEXT NOT NULL,
            version BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table_name}_email ON {table_name}(email)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn validate_profile_tables_postgres(
    pool: &Pool<Postgres>,
) -> Result<(), ProfileError> {
    let expected_columns = [
        ("account_id", "text"),
        ("email", "text"),
        ("document", "text"),
        ("version", "bigint"),
        ("created_at", "timestamp with time zone"),
        ("updated_at", "timestamp with time zone"),
    ];

    validate_postgres_table_schema(
        pool,
        DB_TABLE_PROFILES.as_str(),
        &expected_columns,
        ProfileError::Storage,
    )
    .await
}

pub(super) async fn get_profile_postgres(
    pool: &Pool<Postgres>,
    account_id: &str,
) -> Result<Option<(String, i64)>, ProfileError> {
    let table_name = DB_TABLE_PROFILES.as_str();

    Ok(sqlx::query_as::<_, (String, i64)>(&format!(
        "SELECT document, version FROM {table_name} WHERE account_id = $1"
    ))
    .bind(account_id)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn insert_profile_postgres(
    pool: &Pool<Postgres>,
    profile: &ProfileDocument,
    document: &str,
) -> Result<bool, ProfileError> {
    let table_name = DB_TABLE_PROFILES.as_str();

    let result = sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (account_id, email, document, version, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (account_id) DO NOTHING
        "#
    ))
    .bind(&profile.firebase_uid)
    .bind(&profile.profile.email)
    .bind(document)
    .bind(profile.version)
    .bind(profile.created_at)
    .bind(profile.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(super) async fn update_profile_postgres(
    pool: &Pool<Postgres>,
    profile: &ProfileDocument,
    document: &str,
    expected_version: i64,
    updated_at: DateTime<Utc>,
) -> Result<bool, ProfileError> {
    let table_name = DB_TABLE_PROFILES.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET email = $1, document = $2, version = $3, updated_at = $4
        WHERE account_id = $5 AND version = $6
        "#
    ))
    .bind(&profile.profile.email)
    .bind(document)
    .bind(profile.version)
    .bind(updated_at)
    .bind(&profile.firebase_uid)
    .bind(expected_version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
