use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::ProfileError;

pub const MIN_SEARCH_RADIUS: u32 = 500;
pub const MAX_SEARCH_RADIUS: u32 = 50_000;
pub const DEFAULT_SEARCH_RADIUS: u32 = 2_000;
pub const MIN_AREA_RADIUS: u32 = 100;
pub const MAX_AREA_RADIUS: u32 = 10_000;
pub const DEFAULT_AREA_RADIUS: u32 = 1_000;
pub const MAX_CATEGORY_WEIGHT: u8 = 10;
pub const DEFAULT_CATEGORY_WEIGHT: u8 = 5;
pub const MIN_PRICE_LEVEL: u8 = 1;
pub const MAX_PRICE_LEVEL: u8 = 4;
pub const MAX_CURRENT_STEP: u8 = 5;

/// Closed set of string-valued choices stored in the profile
pub trait Choice: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == value)
    }

    fn allowed() -> Vec<String> {
        Self::ALL.iter().map(|c| c.as_str().to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
    Pt,
}

impl Choice for Language {
    const ALL: &'static [Self] = &[Self::Es, Self::Pt, Self::En];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
            Self::Pt => "pt",
        }
    }
}

/// Countries the app is available in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    Ar,
    Bo,
    Br,
    Cl,
    Co,
    Ec,
    Pe,
    Uy,
    Ve,
    Py,
}

impl Choice for Country {
    const ALL: &'static [Self] = &[
        Self::Ar,
        Self::Bo,
        Self::Br,
        Self::Cl,
        Self::Co,
        Self::Ec,
        Self::Pe,
        Self::Uy,
        Self::Ve,
        Self::Py,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Ar => "AR",
            Self::Bo => "BO",
            Self::Br => "BR",
            Self::Cl => "CL",
            Self::Co => "CO",
            Self::Ec => "EC",
            Self::Pe => "PE",
            Self::Uy => "UY",
            Self::Ve => "VE",
            Self::Py => "PY",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperienceLevel {
    Tourist,
    NewResident,
    #[default]
    Local,
    LongTermResident,
}

impl Choice for ExperienceLevel {
    const ALL: &'static [Self] = &[
        Self::Tourist,
        Self::NewResident,
        Self::Local,
        Self::LongTermResident,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Tourist => "TOURIST",
            Self::NewResident => "NEW_RESIDENT",
            Self::Local => "LOCAL",
            Self::LongTermResident => "LONG_TERM_RESIDENT",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoveryStyle {
    Adventurous,
    #[default]
    Moderate,
    Conservative,
}

impl Choice for DiscoveryStyle {
    const ALL: &'static [Self] = &[Self::Adventurous, Self::Moderate, Self::Conservative];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Adventurous => "ADVENTUROUS",
            Self::Moderate => "MODERATE",
            Self::Conservative => "CONSERVATIVE",
        }
    }
}

/// Onboarding steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingStep {
    Welcome,
    Location,
    Categories,
    Preferences,
    Experience,
    Review,
}

impl Choice for OnboardingStep {
    const ALL: &'static [Self] = &[
        Self::Welcome,
        Self::Location,
        Self::Categories,
        Self::Preferences,
        Self::Experience,
        Self::Review,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Location => "location",
            Self::Categories => "categories",
            Self::Preferences => "preferences",
            Self::Experience => "experience",
            Self::Review => "review",
        }
    }
}

impl OnboardingStep {
    /// Steps that must be done (or explicitly completed) before review
    pub const REQUIRED: [OnboardingStep; 5] = [
        Self::Welcome,
        Self::Location,
        Self::Categories,
        Self::Preferences,
        Self::Experience,
    ];

    pub fn index(&self) -> u8 {
        match self {
            Self::Welcome => 0,
            Self::Location => 1,
            Self::Categories => 2,
            Self::Preferences => 3,
            Self::Experience => 4,
            Self::Review => 5,
        }
    }

    pub fn is_skippable(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

/// GeoJSON point, `[longitude, latitude]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_kind")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

fn point_kind() -> String {
    "Point".to_string()
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, ProfileError> {
        let point = Self {
            kind: point_kind(),
            coordinates: [longitude, latitude],
        };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let [lng, lat] = self.coordinates;
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err(ProfileError::invalid("Invalid coordinates range"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaOfInterest {
    pub name: String,
    pub coordinates: GeoPoint,
    #[serde(default = "default_area_radius")]
    pub radius: u32,
}

fn default_area_radius() -> u32 {
    DEFAULT_AREA_RADIUS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub search_radius: u32,
    pub areas_of_interest: Vec<AreaOfInterest>,
    pub has_location_permission: bool,
}

impl Default for LocationPreferences {
    fn default() -> Self {
        Self {
            current: None,
            address: None,
            search_radius: DEFAULT_SEARCH_RADIUS,
            areas_of_interest: Vec::new(),
            has_location_permission: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPreference {
    pub enabled: bool,
    pub weight: u8,
    #[serde(default)]
    pub subcategories: BTreeMap<String, bool>,
}

impl CategoryPreference {
    fn with_subcategories(enabled: bool, names: &[&str]) -> Self {
        Self {
            enabled,
            weight: DEFAULT_CATEGORY_WEIGHT,
            subcategories: names.iter().map(|n| (n.to_string(), true)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Categories {
    pub food: CategoryPreference,
    pub shopping: CategoryPreference,
    pub services: CategoryPreference,
    pub entertainment: CategoryPreference,
    pub professional: CategoryPreference,
}

impl Categories {
    pub const NAMES: [&'static str; 5] =
        ["food", "shopping", "services", "entertainment", "professional"];

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CategoryPreference> {
        match name {
            "food" => Some(&mut self.food),
            "shopping" => Some(&mut self.shopping),
            "services" => Some(&mut self.services),
            "entertainment" => Some(&mut self.entertainment),
            "professional" => Some(&mut self.professional),
            _ => None,
        }
    }
}

impl Default for Categories {
    fn default() -> Self {
        Self {
            food: CategoryPreference::with_subcategories(
                true,
                &["restaurants", "cafes", "bars", "foodTrucks", "bakeries", "fastFood"],
            ),
            shopping: CategoryPreference::with_subcategories(
                true,
                &["retail", "boutiques", "markets", "supermarkets", "bookstores"],
            ),
            services: CategoryPreference::with_subcategories(
                true,
                &["beauty", "fitness", "healthcare", "automotive", "repair"],
            ),
            entertainment: CategoryPreference::with_subcategories(
                true,
                &["museums", "theaters", "nightlife", "parks", "sports"],
            ),
            professional: CategoryPreference::with_subcategories(
                false,
                &["coworking", "business", "financial", "legal"],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u8,
    pub max: u8,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self { min: 1, max: 3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dietary {
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub halal: bool,
    pub kosher: bool,
    pub keto: bool,
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessibility {
    pub wheelchair_accessible: bool,
    pub hearing_impaired: bool,
    pub visually_impaired: bool,
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub categories: Categories,
    pub price_range: PriceRange,
    pub dietary: Dietary,
    pub accessibility: Accessibility,
    pub experience_level: ExperienceLevel,
    pub discovery_style: DiscoveryStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub preferred_language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsCompleted {
    pub welcome: bool,
    pub location: bool,
    pub categories: bool,
    pub preferences: bool,
    pub experience: bool,
    pub review: bool,
}

impl StepsCompleted {
    pub fn get(&self, step: OnboardingStep) -> bool {
        match step {
            OnboardingStep::Welcome => self.welcome,
            OnboardingStep::Location => self.location,
            OnboardingStep::Categories => self.categories,
            OnboardingStep::Preferences => self.preferences,
            OnboardingStep::Experience => self.experience,
            OnboardingStep::Review => self.review,
        }
    }

    pub fn mark(&mut self, step: OnboardingStep) {
        let flag = match step {
            OnboardingStep::Welcome => &mut self.welcome,
            OnboardingStep::Location => &mut self.location,
            OnboardingStep::Categories => &mut self.categories,
            OnboardingStep::Preferences => &mut self.preferences,
            OnboardingStep::Experience => &mut self.experience,
            OnboardingStep::Review => &mut self.review,
        };
        *flag = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStep {
    pub step: OnboardingStep,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    pub is_completed: bool,
    pub current_step: u8,
    pub steps_completed: StepsCompleted,
    #[serde(default)]
    pub skipped_steps: Vec<SkippedStep>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent_minutes: u32,
}

impl OnboardingState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_completed: false,
            current_step: 0,
            steps_completed: StepsCompleted::default(),
            skipped_steps: Vec::new(),
            started_at: now,
            completed_at: None,
            time_spent_minutes: 0,
        }
    }

    /// Move `current_step` forward to `step`; never backwards, never past the last step
    pub fn advance_to(&mut self, step: u8) {
        self.current_step = self.current_step.max(step).min(MAX_CURRENT_STEP);
    }
}

/// Onboarding profile of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    /// Account id of the identity provider
    pub firebase_uid: String,
    pub profile: Profile,
    #[serde(default)]
    pub location: LocationPreferences,
    #[serde(default)]
    pub preferences: Preferences,
    pub onboarding: OnboardingState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub version: i64,
}

impl ProfileDocument {
    pub fn new(firebase_uid: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            firebase_uid: firebase_uid.into(),
            profile: Profile {
                email: email.into(),
                display_name: None,
                photo_url: None,
                preferred_language: Language::default(),
                country: None,
            },
            location: LocationPreferences::default(),
            preferences: Preferences::default(),
            onboarding: OnboardingState::new(now),
            created_at: now,
            updated_at: now,
            last_active_at: now,
            version: 1,
        }
    }
}
