use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::ProfileError;
use super::storage::ProfileStore;
use super::types::{
    Accessibility, Address, AreaOfInterest, Categories, Choice, Country, Dietary,
    DiscoveryStyle, ExperienceLevel, GeoPoint, Language, LocationPreferences,
    MAX_AREA_RADIUS, MAX_CATEGORY_WEIGHT, MAX_PRICE_LEVEL, MAX_SEARCH_RADIUS, MIN_AREA_RADIUS,
    MIN_PRICE_LEVEL, MIN_SEARCH_RADIUS, OnboardingState, OnboardingStep, PriceRange,
    ProfileDocument, SkippedStep,
};
use crate::oracle::VerifiedToken;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOnboardingRequest {
    pub display_name: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// `[longitude, latitude]`
    pub coordinates: Option<Vec<f64>>,
    pub address: Option<Address>,
    pub search_radius: Option<i64>,
    pub areas_of_interest: Option<Vec<AreaOfInterest>>,
    pub has_location_permission: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub enabled: Option<bool>,
    pub weight: Option<i64>,
    pub subcategories: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoriesUpdate {
    pub categories: Option<BTreeMap<String, CategoryUpdate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRangeUpdate {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryUpdate {
    pub vegetarian: Option<bool>,
    pub vegan: Option<bool>,
    pub gluten_free: Option<bool>,
    pub halal: Option<bool>,
    pub kosher: Option<bool>,
    pub keto: Option<bool>,
    pub other: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityUpdate {
    pub wheelchair_accessible: Option<bool>,
    pub hearing_impaired: Option<bool>,
    pub visually_impaired: Option<bool>,
    pub other: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub price_range: Option<PriceRangeUpdate>,
    pub dietary: Option<DietaryUpdate>,
    pub accessibility: Option<AccessibilityUpdate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceUpdate {
    pub experience_level: Option<String>,
    pub discovery_style: Option<String>,
    pub preferred_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingStatus {
    pub onboarding: OnboardingState,
    pub profile: ProfileSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalPreferences {
    pub price_range: PriceRange,
    pub dietary: Dietary,
    pub accessibility: Accessibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceSettings {
    pub experience_level: ExperienceLevel,
    pub discovery_style: DiscoveryStyle,
    pub preferred_language: Language,
}

fn parse_step(name: &str, allowed: &[OnboardingStep]) -> Result<OnboardingStep, ProfileError> {
    OnboardingStep::parse(name)
        .filter(|step| allowed.contains(step))
        .ok_or_else(|| {
            ProfileError::invalid_with(
                "Invalid step name",
                "validSteps",
                allowed.iter().map(|s| s.as_str().to_string()).collect(),
            )
        })
}

fn parse_choice<T: Choice>(
    value: &str,
    message: &str,
    key: &'static str,
) -> Result<T, ProfileError> {
    T::parse(value).ok_or_else(|| ProfileError::invalid_with(message, key, T::allowed()))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProfileDocument {
    /// Mark `step` done and move the cursor past it
    pub fn complete_step(&mut self, step: OnboardingStep) {
        self.onboarding.steps_completed.mark(step);
        self.onboarding.advance_to(step.index() + 1);
    }

    pub fn skip_step(&mut self, step: OnboardingStep) {
        self.onboarding.skipped_steps.push(SkippedStep {
            step,
            timestamp: Utc::now(),
        });
        self.onboarding.advance_to(step.index() + 1);
    }

    pub fn apply_location(&mut self, update: LocationUpdate) -> Result<(), ProfileError> {
        let current = match &update.coordinates {
            Some(coordinates) => match coordinates.as_slice() {
                [lng, lat] => Some(GeoPoint::new(*lng, *lat)?),
                _ => {
                    return Err(ProfileError::invalid(
                        "Coordinates must be an array of [longitude, latitude]",
                    ));
                }
            },
            None => None,
        };

        let search_radius = match update.search_radius {
            Some(radius)
                if radius < MIN_SEARCH_RADIUS as i64 || radius > MAX_SEARCH_RADIUS as i64 =>
            {
                return Err(ProfileError::invalid(
                    "Search radius must be between 500m and 50km",
                ));
            }
            Some(radius) => Some(radius as u32),
            None => None,
        };

        if let Some(areas) = &update.areas_of_interest {
            for area in areas {
                if area.name.trim().is_empty() || area.name.chars().count() > 100 {
                    return Err(ProfileError::invalid(
                        "Area of interest name must be between 1 and 100 characters",
                    ));
                }
                area.coordinates.validate()?;
                if !(MIN_AREA_RADIUS..=MAX_AREA_RADIUS).contains(&area.radius) {
                    return Err(ProfileError::invalid(
                        "Area of interest radius must be between 100m and 10km",
                    ));
                }
            }
        }

        let location = &mut self.location;
        if current.is_some() {
            location.current = current;
        }
        if let Some(address) = update.address {
            location.address = Some(address);
        }
        if let Some(radius) = search_radius {
            location.search_radius = radius;
        }
        if let Some(areas) = update.areas_of_interest {
            location.areas_of_interest = areas
                .into_iter()
                .map(|area| AreaOfInterest {
                    name: area.name.trim().to_string(),
                    ..area
                })
                .collect();
        }
        if let Some(permission) = update.has_location_permission {
            location.has_location_permission = permission;
        }

        self.onboarding.steps_completed.mark(OnboardingStep::Location);
        self.onboarding.advance_to(2);
        Ok(())
    }

    /// Validates every entry before touching the document
    pub fn apply_categories(
        &mut self,
        updates: BTreeMap<String, CategoryUpdate>,
    ) -> Result<(), ProfileError> {
        for (name, update) in &updates {
            if !Categories::NAMES.contains(&name.as_str()) {
                return Err(ProfileError::invalid_with(
                    format!("Invalid category: {name}"),
                    "validCategories",
                    Categories::NAMES.iter().map(|n| n.to_string()).collect(),
                ));
            }
            if let Some(weight) = update.weight {
                if !(0..=MAX_CATEGORY_WEIGHT as i64).contains(&weight) {
                    return Err(ProfileError::invalid(format!(
                        "Weight for {name} must be between 0 and 10"
                    )));
                }
            }
        }

        for (name, update) in updates {
            let Some(category) = self.preferences.categories.get_mut(&name) else {
                continue;
            };
            if let Some(enabled) = update.enabled {
                category.enabled = enabled;
            }
            if let Some(weight) = update.weight {
                category.weight = weight as u8;
            }
            if let Some(subcategories) = update.subcategories {
                category.subcategories.extend(subcategories);
            }
        }

        self.onboarding.steps_completed.mark(OnboardingStep::Categories);
        self.onboarding.advance_to(3);
        Ok(())
    }

    pub fn apply_preferences(&mut self, update: PreferencesUpdate) -> Result<(), ProfileError> {
        if let Some(range) = &update.price_range {
            let level = MIN_PRICE_LEVEL as i64..=MAX_PRICE_LEVEL as i64;
            if !level.contains(&range.min) || !level.contains(&range.max) {
                return Err(ProfileError::invalid(
                    "Price range values must be between 1 and 4",
                ));
            }
            if range.min > range.max {
                return Err(ProfileError::invalid(
                    "Price range minimum cannot exceed maximum",
                ));
            }
        }

        let preferences = &mut self.preferences;
        if let Some(range) = update.price_range {
            preferences.price_range = PriceRange {
                min: range.min as u8,
                max: range.max as u8,
            };
        }
        if let Some(dietary) = update.dietary {
            let current = &mut preferences.dietary;
            current.vegetarian = dietary.vegetarian.unwrap_or(current.vegetarian);
            current.vegan = dietary.vegan.unwrap_or(current.vegan);
            current.gluten_free = dietary.gluten_free.unwrap_or(current.gluten_free);
            current.halal = dietary.halal.unwrap_or(current.halal);
            current.kosher = dietary.kosher.unwrap_or(current.kosher);
            current.keto = dietary.keto.unwrap_or(current.keto);
            if let Some(other) = dietary.other {
                current.other = other.into_iter().filter_map(|o| trimmed(Some(o))).collect();
            }
        }
        if let Some(accessibility) = update.accessibility {
            let current = &mut preferences.accessibility;
            current.wheelchair_accessible = accessibility
                .wheelchair_accessible
                .unwrap_or(current.wheelchair_accessible);
            current.hearing_impaired = accessibility
                .hearing_impaired
                .unwrap_or(current.hearing_impaired);
            current.visually_impaired = accessibility
                .visually_impaired
                .unwrap_or(current.visually_impaired);
            if let Some(other) = accessibility.other {
                current.other = other.into_iter().filter_map(|o| trimmed(Some(o))).collect();
            }
        }

        self.onboarding.steps_completed.mark(OnboardingStep::Preferences);
        self.onboarding.advance_to(4);
        Ok(())
    }

    pub fn apply_experience(&mut self, update: ExperienceUpdate) -> Result<(), ProfileError> {
        let level = update
            .experience_level
            .as_deref()
            .map(|v| parse_choice::<ExperienceLevel>(v, "Invalid experience level", "validLevels"))
            .transpose()?;
        let style = update
            .discovery_style
            .as_deref()
            .map(|v| parse_choice::<DiscoveryStyle>(v, "Invalid discovery style", "validStyles"))
            .transpose()?;
        let language = update
            .preferred_language
            .as_deref()
            .map(|v| parse_choice::<Language>(v, "Invalid language", "validLanguages"))
            .transpose()?;

        if let Some(level) = level {
            self.preferences.experience_level = level;
        }
        if let Some(style) = style {
            self.preferences.discovery_style = style;
        }
        if let Some(language) = language {
            self.profile.preferred_language = language;
        }

        self.onboarding.steps_completed.mark(OnboardingStep::Experience);
        self.onboarding.advance_to(5);
        Ok(())
    }

    /// Close onboarding once every required step is done
    pub fn finish_onboarding(&mut self) -> Result<(), ProfileError> {
        let steps = &self.onboarding.steps_completed;
        let (completed, missing): (Vec<_>, Vec<_>) = OnboardingStep::REQUIRED
            .into_iter()
            .partition(|step| steps.get(*step));

        if !missing.is_empty() {
            let names = |steps: Vec<OnboardingStep>| -> Vec<String> {
                steps.iter().map(|s| s.as_str().to_string()).collect()
            };
            return Err(ProfileError::Validation {
                message: "Cannot complete onboarding: missing required steps".to_string(),
                details: vec![
                    ("missingSteps", names(missing)),
                    ("completedSteps", names(completed)),
                ],
            });
        }

        let now = Utc::now();
        let elapsed_ms = (now - self.onboarding.started_at).num_milliseconds().max(0);
        let onboarding = &mut self.onboarding;
        onboarding.is_completed = true;
        onboarding.completed_at = Some(now);
        onboarding.time_spent_minutes = (elapsed_ms as f64 / 60_000.0).round() as u32;
        onboarding.steps_completed.mark(OnboardingStep::Review);
        Ok(())
    }
}

/// Load, apply `f`, save. Missing profile is `NotFound`.
async fn mutate(
    account_id: &str,
    f: impl FnOnce(&mut ProfileDocument) -> Result<(), ProfileError>,
) -> Result<ProfileDocument, ProfileError> {
    let mut profile = ProfileStore::get_profile(account_id)
        .await?
        .ok_or_else(|| ProfileError::NotFound.log())?;
    f(&mut profile)?;
    ProfileStore::save_profile(profile).await
}

pub async fn get_onboarding_status(account_id: &str) -> Result<OnboardingStatus, ProfileError> {
    let profile = ProfileStore::get_profile(account_id)
        .await?
        .ok_or_else(|| ProfileError::NotFound.log())?;

    Ok(OnboardingStatus {
        onboarding: profile.onboarding,
        profile: ProfileSummary {
            email: profile.profile.email,
            display_name: profile.profile.display_name,
            country: profile.profile.country,
        },
    })
}

/// Create the profile of a freshly signed-in account
#[tracing::instrument(skip(identity, request), fields(account_id = %identity.uid))]
pub async fn start_onboarding(
    identity: &VerifiedToken,
    request: StartOnboardingRequest,
) -> Result<ProfileDocument, ProfileError> {
    if let Some(existing) = ProfileStore::get_profile(&identity.uid).await? {
        return Err(ProfileError::AlreadyExists(Box::new(existing.onboarding)));
    }

    let email = identity
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| is_plausible_email(e))
        .ok_or_else(|| ProfileError::invalid("A verified email address is required"))?;

    let country = trimmed(request.country)
        .map(|c| parse_choice::<Country>(&c, "Invalid country", "validCountries"))
        .transpose()?;

    let display_name = trimmed(request.display_name);
    if display_name.as_ref().is_some_and(|n| n.chars().count() > 100) {
        return Err(ProfileError::invalid(
            "Display name must be between 1 and 100 characters",
        ));
    }

    let mut profile = ProfileDocument::new(&identity.uid, email);
    profile.profile.display_name = display_name;
    profile.profile.country = country;

    if !ProfileStore::create_profile(&profile).await? {
        // Lost a race with a concurrent start
        let existing = ProfileStore::get_profile(&identity.uid)
            .await?
            .ok_or_else(|| ProfileError::NotFound.log())?;
        return Err(ProfileError::AlreadyExists(Box::new(existing.onboarding)));
    }

    tracing::info!("Onboarding started");
    Ok(profile)
}

pub async fn complete_step(
    account_id: &str,
    step_name: &str,
) -> Result<OnboardingState, ProfileError> {
    let step = parse_step(step_name, OnboardingStep::ALL)?;
    let profile = mutate(account_id, |p| {
        p.complete_step(step);
        Ok(())
    })
    .await?;
    Ok(profile.onboarding)
}

pub async fn skip_step(account_id: &str, step_name: &str) -> Result<OnboardingState, ProfileError> {
    let step = parse_step(step_name, &OnboardingStep::REQUIRED)?;
    let profile = mutate(account_id, |p| {
        p.skip_step(step);
        Ok(())
    })
    .await?;
    Ok(profile.onboarding)
}

pub async fn save_location(
    account_id: &str,
    update: LocationUpdate,
) -> Result<LocationPreferences, ProfileError> {
    let profile = mutate(account_id, |p| p.apply_location(update)).await?;
    Ok(profile.location)
}

pub async fn save_categories(
    account_id: &str,
    update: CategoriesUpdate,
) -> Result<Categories, ProfileError> {
    let categories = update
        .categories
        .ok_or_else(|| ProfileError::invalid("Categories object is required"))?;
    let profile = mutate(account_id, |p| p.apply_categories(categories)).await?;
    Ok(profile.preferences.categories)
}

pub async fn save_preferences(
    account_id: &str,
    update: PreferencesUpdate,
) -> Result<PersonalPreferences, ProfileError> {
    let profile = mutate(account_id, |p| p.apply_preferences(update)).await?;
    Ok(PersonalPreferences {
        price_range: profile.preferences.price_range,
        dietary: profile.preferences.dietary,
        accessibility: profile.preferences.accessibility,
    })
}

pub async fn save_experience(
    account_id: &str,
    update: ExperienceUpdate,
) -> Result<ExperienceSettings, ProfileError> {
    let profile = mutate(account_id, |p| p.apply_experience(update)).await?;
    Ok(ExperienceSettings {
        experience_level: profile.preferences.experience_level,
        discovery_style: profile.preferences.discovery_style,
        preferred_language: profile.profile.preferred_language,
    })
}

#[tracing::instrument]
pub async fn complete_onboarding(account_id: &str) -> Result<ProfileDocument, ProfileError> {
    let profile = mutate(account_id, |p| p.finish_onboarding()).await?;
    tracing::info!(
        minutes = profile.onboarding.time_spent_minutes,
        "Onboarding completed"
    );
    Ok(profile)
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}
