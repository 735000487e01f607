//! Error types for the account linking flow

use thiserror::Error;

use crate::oracle::OracleError;

pub(crate) const MISSING_EMAIL_MESSAGE: &str =
    "Could not find email in error. Please try signing in with your existing provider first.";
pub(crate) const CANCELLED_MESSAGE: &str = "Sign-in was cancelled. Please try again.";
pub(crate) const POPUP_BLOCKED_MESSAGE: &str =
    "Popup was blocked. Please allow popups and try again.";
pub(crate) const ALREADY_LINKED_MESSAGE: &str =
    "This account is already linked. You can now sign in with either provider.";

/// Failures surfaced by the conflict resolver.
///
/// `AlreadyLinked` never appears here; the resolver absorbs it. The `Display`
/// text of every variant is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkingError {
    /// No email anywhere in the collision signal
    #[error("{}", MISSING_EMAIL_MESSAGE)]
    MissingEmail,

    /// The provider guess names a provider this app does not support
    #[error("Unknown existing provider: {0}")]
    UnknownProvider(String),

    #[error("{}", CANCELLED_MESSAGE)]
    UserCancelled,

    #[error("{}", POPUP_BLOCKED_MESSAGE)]
    PopupBlocked,

    #[error("{message}")]
    Unrecoverable { message: String },
}

impl LinkingError {
    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::MissingEmail => tracing::warn!("Collision carried no email"),
            Self::UnknownProvider(provider) => {
                tracing::warn!(provider = %provider, "Unknown existing provider")
            }
            Self::UserCancelled => tracing::info!("Re-authentication cancelled by the user"),
            Self::PopupBlocked => tracing::info!("Re-authentication popup was blocked"),
            Self::Unrecoverable { message } => {
                tracing::error!("Unrecoverable linking error: {}", message)
            }
        }
        self
    }

    /// Wrap an arbitrary failure message, rewriting known ones for the user
    pub fn unrecoverable(raw: impl AsRef<str>) -> Self {
        Self::Unrecoverable {
            message: user_facing_message(raw.as_ref()),
        }
    }
}

/// Map raw failure text onto the user-facing message by substring
pub(crate) fn user_facing_message(raw: &str) -> String {
    if raw.contains("popup") {
        POPUP_BLOCKED_MESSAGE.to_string()
    } else if raw.contains("cancelled") {
        CANCELLED_MESSAGE.to_string()
    } else if raw.contains("credential-already-in-use") {
        ALREADY_LINKED_MESSAGE.to_string()
    } else {
        raw.to_string()
    }
}

// Converts and logs, like every error crossing into the linking layer
impl From<OracleError> for LinkingError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::UserCancelled => Self::UserCancelled.log(),
            OracleError::PopupBlocked => Self::PopupBlocked.log(),
            OracleError::UnknownProvider(provider) => Self::UnknownProvider(provider).log(),
            other => {
                let error = Self::unrecoverable(other.to_string());
                tracing::error!(cause = %other, "{}", error);
                error
            }
        }
    }
}
