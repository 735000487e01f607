use async_trait::async_trait;

use super::errors::OracleError;
use super::observer::{AccountObserver, Subscription};
use super::types::{Account, PendingCredential, ProviderCredential, ProviderIdentity};

/// Sign-in, sign-out and linking primitives of the external identity system.
///
/// `sign_in` fails with [`OracleError::ProviderConflict`] when the provider's
/// email is already bound to a different provider; that is the only signal the
/// linking flow reacts to.
#[async_trait]
pub trait IdentityOracle: Send + Sync {
    /// Interactive sign-in against the named provider
    async fn sign_in(&self, provider: ProviderIdentity) -> Result<Account, OracleError>;

    /// End the current session. Signing out twice is not an error.
    async fn sign_out(&self) -> Result<(), OracleError>;

    /// Register an observer fired on every account transition
    fn on_account_changed(&self, observer: AccountObserver) -> Subscription;

    /// Attach a second provider's credential to an authenticated account
    async fn verify_and_link_credential(
        &self,
        account: &Account,
        credential: PendingCredential,
    ) -> Result<Account, OracleError>;

    /// Provider ids already registered for `email`. Best effort; may be empty.
    async fn lookup_providers_for_email(&self, email: &str) -> Result<Vec<String>, OracleError>;
}

/// The interactive surface (popup, redirect, device flow) that obtains a
/// provider credential from the user.
#[async_trait]
pub trait ProviderPrompt: Send + Sync {
    /// Fails with `UserCancelled` when the user aborts and `PopupBlocked`
    /// when the surface cannot be shown.
    async fn request_credential(
        &self,
        provider: ProviderIdentity,
    ) -> Result<ProviderCredential, OracleError>;
}
