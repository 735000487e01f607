//! Onboarding profiles: the per-account document and the step-by-step
//! operations that fill it in.

mod errors;
mod onboarding;
mod storage;
mod types;

pub use errors::ProfileError;
pub use onboarding::{
    AccessibilityUpdate, CategoriesUpdate, CategoryUpdate, DietaryUpdate, ExperienceSettings,
    ExperienceUpdate, LocationUpdate, OnboardingStatus, PersonalPreferences, PreferencesUpdate,
    PriceRangeUpdate, ProfileSummary, StartOnboardingRequest, complete_onboarding, complete_step,
    get_onboarding_status, save_categories, save_experience, save_location, save_preferences,
    skip_step, start_onboarding,
};
pub use storage::ProfileStore;
pub use types::{
    Accessibility, Address, AreaOfInterest, Categories, CategoryPreference, Choice, Country,
    Dietary, DiscoveryStyle, ExperienceLevel, GeoPoint, Language, LocationPreferences,
    OnboardingState, OnboardingStep, Preferences, PriceRange, Profile, ProfileDocument,
    SkippedStep, StepsCompleted,
};

pub(crate) async fn init() -> Result<(), ProfileError> {
    ProfileStore::init().await
}
