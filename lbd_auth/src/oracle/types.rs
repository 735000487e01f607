use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::OracleError;

/// Supported external identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderIdentity {
    #[serde(rename = "google.com")]
    Google,
    #[serde(rename = "github.com")]
    GitHub,
}

impl ProviderIdentity {
    pub const ALL: [ProviderIdentity; 2] = [ProviderIdentity::Google, ProviderIdentity::GitHub];

    /// Provider id as used by the identity oracle (e.g. "google.com")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google.com",
            Self::GitHub => "github.com",
        }
    }

    /// Human readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::GitHub => "GitHub",
        }
    }

    /// Reverse of `display_name`
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.display_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderIdentity {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google.com" => Ok(Self::Google),
            "github.com" => Ok(Self::GitHub),
            _ => Err(OracleError::UnknownProvider(s.to_string())),
        }
    }
}

/// Read-only snapshot of the account owned by the identity oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    /// Provider ids linked to this account, e.g. ["google.com", "github.com"]
    pub providers: Vec<String>,
}

impl Account {
    pub fn is_linked_to(&self, provider: ProviderIdentity) -> bool {
        self.providers.iter().any(|p| p == provider.as_str())
    }
}

/// Credential artifact left over from the sign-in attempt that collided.
///
/// Opaque to the linking flow; only the oracle interprets `post_body`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCredential {
    pub provider: String,
    pub post_body: String,
}

impl fmt::Debug for PendingCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCredential")
            .field("provider", &self.provider)
            .field("post_body", &"[redacted]")
            .finish()
    }
}

/// Credential returned by the interactive provider surface
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    pub provider: ProviderIdentity,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

impl ProviderCredential {
    /// Form-encoded body understood by `accounts:signInWithIdp`
    pub fn post_body(&self) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        if let Some(id_token) = &self.id_token {
            form.append_pair("id_token", id_token);
        }
        if let Some(access_token) = &self.access_token {
            form.append_pair("access_token", access_token);
        }
        form.append_pair("providerId", self.provider.as_str());
        form.finish()
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("provider", &self.provider)
            .field("id_token", &self.id_token.as_ref().map(|_| "[redacted]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl From<ProviderCredential> for PendingCredential {
    fn from(credential: ProviderCredential) -> Self {
        Self {
            provider: credential.provider.as_str().to_string(),
            post_body: credential.post_body(),
        }
    }
}

/// Nested metadata attached to a collision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionMetadata {
    pub email: Option<String>,
    pub app_name: Option<String>,
    pub tenant_id: Option<String>,
}

/// Raw token response fields the oracle returned with the collision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionTokenResponse {
    pub email: Option<String>,
    #[serde(default, rename = "verifiedProvider")]
    pub verified_providers: Vec<String>,
}

/// Raised when a sign-in targets an email already bound to another provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionSignal {
    /// Provider whose sign-in attempt collided
    pub attempted_provider: Option<ProviderIdentity>,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: CollisionMetadata,
    #[serde(default)]
    pub token_response: CollisionTokenResponse,
    pub pending_credential: Option<PendingCredential>,
    /// Provider ids believed to own the email, most likely first
    #[serde(default)]
    pub hints: Vec<String>,
}

impl CollisionSignal {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    pub fn with_attempted_provider(mut self, provider: ProviderIdentity) -> Self {
        self.attempted_provider = Some(provider);
        self
    }

    pub fn with_credential(mut self, credential: PendingCredential) -> Self {
        self.pending_credential = Some(credential);
        self
    }

    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_verified_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_response.verified_providers = providers.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_identity_round_trips_ids_and_names() {
        for provider in ProviderIdentity::ALL {
            assert_eq!(provider.as_str().parse::<ProviderIdentity>().unwrap(), provider);
            assert_eq!(
                ProviderIdentity::from_display_name(provider.display_name()),
                Some(provider)
            );
        }
        assert_eq!(
            ProviderIdentity::from_display_name("github"),
            Some(ProviderIdentity::GitHub)
        );
    }

    #[test]
    fn test_unknown_provider_id_is_rejected() {
        let err = "twitter.com".parse::<ProviderIdentity>().unwrap_err();
        assert!(matches!(err, OracleError::UnknownProvider(ref p) if p == "twitter.com"));
        assert_eq!(ProviderIdentity::from_display_name("Twitter"), None);
    }

    #[test]
    fn test_provider_credential_post_body() {
        let credential = ProviderCredential {
            provider: ProviderIdentity::GitHub,
            id_token: None,
            access_token: Some("gho_abc+/=".to_string()),
        };
        assert_eq!(
            credential.post_body(),
            "access_token=gho_abc%2B%2F%3D&providerId=github.com"
        );

        let pending = PendingCredential::from(credential);
        assert_eq!(pending.provider, "github.com");
    }

    #[test]
    fn test_credentials_are_redacted_in_debug_output() {
        let credential = ProviderCredential {
            provider: ProviderIdentity::Google,
            id_token: Some("secret-id-token".to_string()),
            access_token: None,
        };
        let pending = PendingCredential::from(credential.clone());

        assert!(!format!("{credential:?}").contains("secret-id-token"));
        assert!(!format!("{pending:?}").contains("secret-id-token"));
    }

    #[test]
    fn test_collision_signal_deserializes_token_response_shape() {
        let json = r#"{
            "email": "u@x.com",
            "tokenResponse": { "email": "u@x.com", "verifiedProvider": ["google.com"] }
        }"#;
        let signal: CollisionSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.token_response.verified_providers, vec!["google.com"]);
        assert!(signal.hints.is_empty());
        assert!(signal.pending_credential.is_none());
    }

    #[test]
    fn test_account_is_linked_to() {
        let account = Account {
            id: "uid-1".to_string(),
            display_name: None,
            email: Some("u@x.com".to_string()),
            photo_url: None,
            providers: vec!["google.com".to_string()],
        };
        assert!(account.is_linked_to(ProviderIdentity::Google));
        assert!(!account.is_linked_to(ProviderIdentity::GitHub));
    }
}
