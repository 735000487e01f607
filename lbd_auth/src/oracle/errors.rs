use thiserror::Error;

use super::types::CollisionSignal;

#[derive(Debug, Error, Clone)]
pub enum OracleError {
    /// The target email is already bound to a different provider
    #[error("auth/account-exists-with-different-credential: {}", .0.email.as_deref().unwrap_or("<unknown email>"))]
    ProviderConflict(Box<CollisionSignal>),

    #[error("auth/user-cancelled: sign-in was cancelled by the user")]
    UserCancelled,

    #[error("auth/popup-blocked: unable to open the sign-in popup")]
    PopupBlocked,

    /// The credential is already associated with this or another account
    #[error("auth/credential-already-in-use: {0}")]
    AlreadyLinked(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Identity provider error {code}: {message}")]
    Provider { code: String, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OracleError {
    /// Map an identity toolkit error code onto the oracle taxonomy
    pub(crate) fn from_toolkit_code(code: &str) -> Self {
        // Codes may carry a trailing detail, e.g. "INVALID_IDP_RESPONSE : ..."
        let bare = code.split(':').next().unwrap_or(code).trim();
        match bare {
            "FEDERATED_USER_ID_ALREADY_LINKED"
            | "CREDENTIAL_ALREADY_IN_USE"
            | "PROVIDER_ALREADY_LINKED" => Self::AlreadyLinked(bare.to_string()),
            "USER_CANCELLED" => Self::UserCancelled,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "USER_DISABLED" => {
                Self::Session(bare.to_string())
            }
            _ => Self::Provider {
                code: bare.to_string(),
                message: code.to_string(),
            },
        }
    }

    pub fn is_already_linked(&self) -> bool {
        matches!(self, Self::AlreadyLinked(_))
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
