mod adapter;
mod config;
mod errors;
mod observer;
mod token;
mod toolkit;
mod types;

pub use adapter::{IdentityOracle, ProviderPrompt};
pub use errors::OracleError;
pub use observer::{AccountObserver, AccountObservers, Subscription};
pub use token::{TokenVerificationError, VerifiedToken, verify_id_token, verify_id_token_with};
pub use toolkit::IdentityToolkitOracle;
pub use types::{
    Account, CollisionMetadata, CollisionSignal, CollisionTokenResponse, PendingCredential,
    ProviderCredential, ProviderIdentity,
};
