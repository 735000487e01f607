use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::LBD_DEFAULT_EXISTING_PROVIDER;
use crate::oracle::{Account, CollisionSignal, IdentityOracle, PendingCredential, ProviderIdentity};

use super::errors::LinkingError;

/// Steps of one collision resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkingState {
    Idle,
    Detecting,
    ReauthenticatingExisting,
    MergingCredential,
    Resolved,
    ResolvedWithoutMerge,
    Unrecoverable,
}

impl LinkingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::ReauthenticatingExisting => "reauthenticating_existing",
            Self::MergingCredential => "merging_credential",
            Self::Resolved => "resolved",
            Self::ResolvedWithoutMerge => "resolved_without_merge",
            Self::Unrecoverable => "unrecoverable",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Resolved | Self::ResolvedWithoutMerge | Self::Unrecoverable
        )
    }
}

impl fmt::Display for LinkingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful end of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Signed in, and the pending credential (if any) is linked
    Resolved(Account),
    /// Signed in with the existing provider; the new credential is not linked
    ResolvedWithoutMerge { account: Account, warning: String },
}

impl LinkOutcome {
    pub fn account(&self) -> &Account {
        match self {
            Self::Resolved(account) | Self::ResolvedWithoutMerge { account, .. } => account,
        }
    }

    pub fn into_account(self) -> Account {
        match self {
            Self::Resolved(account) | Self::ResolvedWithoutMerge { account, .. } => account,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Resolved(_) => None,
            Self::ResolvedWithoutMerge { warning, .. } => Some(warning),
        }
    }

    pub fn state(&self) -> LinkingState {
        match self {
            Self::Resolved(_) => LinkingState::Resolved,
            Self::ResolvedWithoutMerge { .. } => LinkingState::ResolvedWithoutMerge,
        }
    }
}

/// Where the existing-provider guess came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSource {
    Hint,
    Lookup,
    VerifiedProvider,
    Default,
}

/// Result of detection: everything needed to re-authenticate and merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlan {
    pub attempt_id: String,
    pub email: String,
    pub existing_provider: ProviderIdentity,
    pub provider_source: ProviderSource,
    pub pending_credential: Option<PendingCredential>,
}

/// First non-empty email among the top-level, metadata and token-response fields
pub fn extract_collision_email(signal: &CollisionSignal) -> Option<&str> {
    [
        signal.email.as_deref(),
        signal.metadata.email.as_deref(),
        signal.token_response.email.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|email| !email.is_empty())
}

/// Accepts provider ids ("github.com") and display names ("GitHub")
pub(crate) fn parse_provider(raw: &str) -> Result<ProviderIdentity, LinkingError> {
    let raw = raw.trim();
    ProviderIdentity::from_str(raw)
        .ok()
        .or_else(|| ProviderIdentity::from_display_name(raw))
        .ok_or_else(|| LinkingError::UnknownProvider(raw.to_string()))
}

fn first_entry(entries: &[String]) -> Option<&str> {
    entries
        .iter()
        .map(|entry| entry.trim())
        .find(|entry| !entry.is_empty())
}

fn transition(attempt_id: &str, from: LinkingState, to: LinkingState) {
    tracing::info!(
        attempt_id,
        from = %from,
        to = %to,
        "Linking state transition"
    );
}

/// Reconciles a provider collision: re-authenticate with the provider that
/// already owns the email, then merge the pending credential into that account.
pub struct ConflictResolver {
    oracle: Arc<dyn IdentityOracle>,
    default_provider: String,
}

impl ConflictResolver {
    pub fn new(oracle: Arc<dyn IdentityOracle>) -> Self {
        Self {
            oracle,
            default_provider: LBD_DEFAULT_EXISTING_PROVIDER.clone(),
        }
    }

    pub fn with_default_provider(mut self, provider: ProviderIdentity) -> Self {
        self.default_provider = provider.as_str().to_string();
        self
    }

    /// Detect and re-authenticate, then merge
    pub async fn resolve(&self, signal: &CollisionSignal) -> Result<LinkOutcome, LinkingError> {
        let plan = self.plan(signal).await?;
        self.execute(plan).await
    }

    /// Detecting step: pick the email and the provider to re-authenticate with.
    ///
    /// Provider guess order: signal hints, the oracle's email lookup (errors
    /// ignored), verified providers in the token response, the configured
    /// default. Only the winning entry is parsed.
    #[tracing::instrument(skip_all, fields(attempt_id))]
    pub async fn plan(&self, signal: &CollisionSignal) -> Result<LinkPlan, LinkingError> {
        let attempt_id = uuid::Uuid::new_v4().to_string();
        tracing::Span::current().record("attempt_id", attempt_id.as_str());
        transition(&attempt_id, LinkingState::Idle, LinkingState::Detecting);

        let result = self.detect(signal, attempt_id.clone()).await;
        if let Err(e) = &result {
            transition(&attempt_id, LinkingState::Detecting, LinkingState::Unrecoverable);
            tracing::debug!(attempt_id, error = %e, "Collision could not be resolved");
        }
        result
    }

    async fn detect(
        &self,
        signal: &CollisionSignal,
        attempt_id: String,
    ) -> Result<LinkPlan, LinkingError> {
        let email = extract_collision_email(signal)
            .ok_or_else(|| LinkingError::MissingEmail.log())?
            .to_string();

        let (raw_provider, provider_source) = match first_entry(&signal.hints) {
            Some(hint) => (hint.to_string(), ProviderSource::Hint),
            None => self.guess_without_hints(signal, &email).await,
        };
        let existing_provider = parse_provider(&raw_provider).map_err(LinkingError::log)?;

        tracing::info!(
            attempt_id,
            existing_provider = %existing_provider,
            source = ?provider_source,
            has_credential = signal.pending_credential.is_some(),
            "Collision detected"
        );

        Ok(LinkPlan {
            attempt_id,
            email,
            existing_provider,
            provider_source,
            pending_credential: signal.pending_credential.clone(),
        })
    }

    async fn guess_without_hints(
        &self,
        signal: &CollisionSignal,
        email: &str,
    ) -> (String, ProviderSource) {
        match self.oracle.lookup_providers_for_email(email).await {
            Ok(providers) => {
                if let Some(provider) = first_entry(&providers) {
                    return (provider.to_string(), ProviderSource::Lookup);
                }
            }
            Err(e) => tracing::debug!(error = %e, "Provider lookup unavailable"),
        }

        if let Some(provider) = first_entry(&signal.token_response.verified_providers) {
            return (provider.to_string(), ProviderSource::VerifiedProvider);
        }

        (self.default_provider.clone(), ProviderSource::Default)
    }

    /// Re-authenticate with the planned provider and merge the pending credential.
    #[tracing::instrument(skip_all, fields(attempt_id = %plan.attempt_id, existing_provider = %plan.existing_provider))]
    pub async fn execute(&self, plan: LinkPlan) -> Result<LinkOutcome, LinkingError> {
        let LinkPlan {
            attempt_id,
            existing_provider,
            pending_credential,
            ..
        } = plan;

        transition(
            &attempt_id,
            LinkingState::Detecting,
            LinkingState::ReauthenticatingExisting,
        );

        let account = match self.oracle.sign_in(existing_provider).await {
            Ok(account) => account,
            Err(e) => {
                transition(
                    &attempt_id,
                    LinkingState::ReauthenticatingExisting,
                    LinkingState::Unrecoverable,
                );
                return Err(LinkingError::from(e));
            }
        };

        let Some(credential) = pending_credential else {
            tracing::debug!(attempt_id, "No pending credential to merge");
            transition(
                &attempt_id,
                LinkingState::ReauthenticatingExisting,
                LinkingState::Resolved,
            );
            return Ok(LinkOutcome::Resolved(account));
        };

        transition(
            &attempt_id,
            LinkingState::ReauthenticatingExisting,
            LinkingState::MergingCredential,
        );

        let new_provider = parse_provider(&credential.provider)
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|_| credential.provider.clone());

        let outcome = match self
            .oracle
            .verify_and_link_credential(&account, credential)
            .await
        {
            Ok(linked) => LinkOutcome::Resolved(linked),
            Err(e) if e.is_already_linked() => {
                tracing::info!(attempt_id, "Credential was already linked");
                LinkOutcome::Resolved(account)
            }
            Err(e) => {
                tracing::warn!(attempt_id, error = %e, "Credential merge failed");
                LinkOutcome::ResolvedWithoutMerge {
                    warning: format!(
                        "Signed in with {}, but your {} account could not be linked: {}",
                        existing_provider.display_name(),
                        new_provider,
                        e
                    ),
                    account,
                }
            }
        };

        transition(
            &attempt_id,
            LinkingState::MergingCredential,
            outcome.state(),
        );
        Ok(outcome)
    }
}
