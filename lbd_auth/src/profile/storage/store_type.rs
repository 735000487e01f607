use chrono::Utc;

use crate::profile::{errors::ProfileError, types::ProfileDocument};
use crate::storage::GENERIC_DATA_STORE;

use super::postgres::*;
use super::sqlite::*;

/// Persistence of onboarding profiles, one JSON document per account
pub struct ProfileStore;

impl ProfileStore {
    /// Create the profiles table if needed
    pub async fn init() -> Result<(), ProfileError> {
        let store = GENERIC_DATA_STORE.lock().await;

        match (store.as_sqlite(), store.as_postgres()) {
            (Some(pool), _) => create_tables_sqlite(pool).await,
            (_, Some(pool)) => {
                create_tables_postgres(pool).await?;
                validate_profile_tables_postgres(pool).await
            }
            _ => Err(ProfileError::Storage("Unsupported database type".to_string())),
        }
    }

    #[tracing::instrument(err(level = "debug"))]
    pub async fn get_profile(account_id: &str) -> Result<Option<ProfileDocument>, ProfileError> {
        let row = {
            let store = GENERIC_DATA_STORE.lock().await;
            if let Some(pool) = store.as_sqlite() {
                get_profile_sqlite(pool, account_id).await?
            } else if let Some(pool) = store.as_postgres() {
                get_profile_postgres(pool, account_id).await?
            } else {
                return Err(ProfileError::Storage("Unsupported database type".to_string()));
            }
        };

        match row {
            Some((document, version)) => {
                let mut profile: ProfileDocument = serde_json::from_str(&document)?;
                profile.version = version;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    /// Insert a new profile. Returns `false` if one already exists for the account.
    #[tracing::instrument(skip(profile), fields(account_id = %profile.firebase_uid), err(level = "debug"))]
    pub async fn create_profile(profile: &ProfileDocument) -> Result<bool, ProfileError> {
        let document = serde_json::to_string(profile)?;
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            insert_profile_sqlite(pool, profile, &document).await
        } else if let Some(pool) = store.as_postgres() {
            insert_profile_postgres(pool, profile, &document).await
        } else {
            Err(ProfileError::Storage("Unsupported database type".to_string()))
        }
    }

    /// Write back a loaded profile, bumping `version` and `updated_at`.
    ///
    /// Fails with `Conflict` if the stored version is no longer the one loaded.
    #[tracing::instrument(skip(profile), fields(account_id = %profile.firebase_uid, version = profile.version), err(level = "debug"))]
    pub async fn save_profile(mut profile: ProfileDocument) -> Result<ProfileDocument, ProfileError> {
        let expected_version = profile.version;
        let now = Utc::now();
        profile.version = expected_version + 1;
        profile.updated_at = now;
        profile.last_active_at = now;

        let document = serde_json::to_string(&profile)?;
        let store = GENERIC_DATA_STORE.lock().await;

        let updated = if let Some(pool) = store.as_sqlite() {
            update_profile_sqlite(pool, &profile, &document, expected_version, now).await?
        } else if let Some(pool) = store.as_postgres() {
            update_profile_postgres(pool, &profile, &document, expected_version, now).await?
        } else {
            return Err(ProfileError::Storage("Unsupported database type".to_string()));
        };

        if !updated {
            return Err(ProfileError::Conflict(format!(
                "expected version {expected_version} of {}",
                profile.firebase_uid
            )));
        }
        Ok(profile)
    }
}
