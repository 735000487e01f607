//! lbd_auth - Sign-in, account linking and onboarding profiles for the
//! local recommendations app
//!
//! Sign-in goes through an [`IdentityOracle`]. When a provider reports that the
//! email already belongs to an account of another provider, the
//! [`ConflictResolver`] signs in with that provider and links the pending
//! credential. [`AuthSessionController`] drives this from a UI and exposes the
//! session state. Onboarding profiles are stored per account in sqlite or postgres.

mod config;
mod coordination;
mod oracle;
mod profile;
mod session;
mod storage;

#[cfg(test)]
mod test_utils;

pub use config::LBD_DEFAULT_EXISTING_PROVIDER;

pub use coordination::{
    ConflictResolver, LinkOutcome, LinkPlan, LinkingError, LinkingState, ProviderSource,
    extract_collision_email,
};

pub use oracle::{
    Account, AccountObserver, AccountObservers, CollisionMetadata, CollisionSignal,
    CollisionTokenResponse, IdentityOracle, IdentityToolkitOracle, OracleError,
    PendingCredential, ProviderCredential, ProviderIdentity, ProviderPrompt, Subscription,
    TokenVerificationError, VerifiedToken, verify_id_token, verify_id_token_with,
};

pub use profile::{
    Accessibility, AccessibilityUpdate, Address, AreaOfInterest, Categories, CategoriesUpdate,
    CategoryPreference, CategoryUpdate, Choice, Country, Dietary, DietaryUpdate, DiscoveryStyle,
    ExperienceLevel, ExperienceSettings, ExperienceUpdate, GeoPoint, Language,
    LocationPreferences, LocationUpdate, OnboardingState, OnboardingStatus, OnboardingStep,
    PersonalPreferences, Preferences, PreferencesUpdate, PriceRange, PriceRangeUpdate, Profile,
    ProfileDocument, ProfileError, ProfileStore, ProfileSummary, SkippedStep,
    StartOnboardingRequest, StepsCompleted, complete_onboarding, complete_step,
    get_onboarding_status, save_categories, save_experience, save_location, save_preferences,
    skip_step, start_onboarding,
};

pub use session::{AuthSessionController, ConfirmLinking, LinkingPrompt, SessionSnapshot};

pub use storage::StorageError;

/// Initialize the data store and create the profile tables
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    storage::init().await?;
    profile::init().await?;
    Ok(())
}
