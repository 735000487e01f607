use thiserror::Error;

use super::types::OnboardingState;
use crate::storage::StorageError;

#[derive(Clone, Error, Debug)]
pub enum ProfileError {
    #[error("User not found")]
    NotFound,

    /// Onboarding was already started; carries the stored progress
    #[error("User already exists")]
    AlreadyExists(Box<OnboardingState>),

    /// Rejected input. `details` become extra fields of the error body,
    /// e.g. `("validSteps", [...])`.
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<(&'static str, Vec<String>)>,
    },

    /// The stored document changed between load and save
    #[error("Profile was modified concurrently: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ProfileError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn invalid_with(message: impl Into<String>, key: &'static str, values: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: vec![(key, values)],
        }
    }

    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::NotFound => tracing::debug!("Profile not found"),
            Self::AlreadyExists(_) => tracing::debug!("Profile already exists"),
            Self::Validation { message, .. } => tracing::debug!("Validation error: {}", message),
            Self::Conflict(msg) => tracing::warn!("Profile conflict: {}", msg),
            Self::Storage(msg) => tracing::error!("Storage error: {}", msg),
            Self::InvalidData(msg) => tracing::error!("Invalid profile data: {}", msg),
        }
        self
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

impl From<sqlx::Error> for ProfileError {
    fn from(err: sqlx::Error) -> Self {
        let error = Self::Storage(err.to_string());
        tracing::error!("{}", error);
        error
    }
}

impl From<StorageError> for ProfileError {
    fn from(err: StorageError) -> Self {
        let error = Self::Storage(err.to_string());
        tracing::error!("{}", error);
        error
    }
}
