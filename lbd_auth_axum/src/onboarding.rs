use axum::{
    Json, Router,
    extract::{Path, rejection::JsonRejection},
    routing::{get, post, put},
};
use chrono::Utc;
use http::StatusCode;
use serde_json::{Value, json};

use lbd_auth::{
    CategoriesUpdate, ExperienceUpdate, LocationUpdate, OnboardingStatus, PreferencesUpdate,
    StartOnboardingRequest,
};

use super::error::{ApiError, IntoResponseError, error_body};
use super::session::{ApiState, AuthUser};

pub(super) fn router() -> Router<ApiState> {
    Router::new()
        .route("/test-no-auth", get(test_no_auth))
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/step/{step}", put(complete_step))
        .route("/location", put(save_location))
        .route("/categories", put(save_categories))
        .route("/preferences", put(save_preferences))
        .route("/experience", put(save_experience))
        .route("/complete", post(complete))
        .route("/skip/{step}", put(skip_step))
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        (StatusCode::BAD_REQUEST, error_body(e.body_text()))
    })
}

async fn test_no_auth() -> Json<Value> {
    Json(json!({
        "message": "Onboarding routes are working!",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn status(user: AuthUser) -> Result<Json<OnboardingStatus>, ApiError> {
    lbd_auth::get_onboarding_status(&user.account_id)
        .await
        .into_response_error("Failed to get onboarding status")
        .map(Json)
}

async fn start(
    user: AuthUser,
    body: Result<Json<StartOnboardingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // A start request may come without a body
    let request = match body {
        Err(JsonRejection::MissingJsonContentType(_)) => StartOnboardingRequest::default(),
        other => parse_body(other)?,
    };

    let profile = lbd_auth::start_onboarding(&user.identity, request)
        .await
        .into_response_error("Failed to start onboarding")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Onboarding started successfully",
            "user": {
                "firebaseUid": profile.firebase_uid,
                "profile": profile.profile,
                "onboarding": profile.onboarding,
            }
        })),
    ))
}

async fn complete_step(user: AuthUser, Path(step): Path<String>) -> Result<Json<Value>, ApiError> {
    let onboarding = lbd_auth::complete_step(&user.account_id, &step)
        .await
        .into_response_error("Failed to complete step")?;

    Ok(Json(json!({
        "message": format!("Step {step} completed"),
        "onboarding": onboarding,
    })))
}

async fn skip_step(user: AuthUser, Path(step): Path<String>) -> Result<Json<Value>, ApiError> {
    let onboarding = lbd_auth::skip_step(&user.account_id, &step)
        .await
        .into_response_error("Failed to skip step")?;

    Ok(Json(json!({
        "message": format!("Step {step} skipped"),
        "onboarding": onboarding,
    })))
}

async fn save_location(
    user: AuthUser,
    body: Result<Json<LocationUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let location = lbd_auth::save_location(&user.account_id, parse_body(body)?)
        .await
        .into_response_error("Failed to save location preferences")?;

    Ok(Json(json!({
        "message": "Location preferences saved",
        "location": location,
    })))
}

async fn save_categories(
    user: AuthUser,
    body: Result<Json<CategoriesUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let categories = lbd_auth::save_categories(&user.account_id, parse_body(body)?)
        .await
        .into_response_error("Failed to save category preferences")?;

    Ok(Json(json!({
        "message": "Category preferences saved",
        "categories": categories,
    })))
}

async fn save_preferences(
    user: AuthUser,
    body: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let preferences = lbd_auth::save_preferences(&user.account_id, parse_body(body)?)
        .await
        .into_response_error("Failed to save personal preferences")?;

    Ok(Json(json!({
        "message": "Personal preferences saved",
        "preferences": preferences,
    })))
}

async fn save_experience(
    user: AuthUser,
    body: Result<Json<ExperienceUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let experience = lbd_auth::save_experience(&user.account_id, parse_body(body)?)
        .await
        .into_response_error("Failed to save experience preferences")?;

    Ok(Json(json!({
        "message": "Experience preferences saved",
        "experience": experience,
    })))
}

async fn complete(user: AuthUser) -> Result<Json<Value>, ApiError> {
    let profile = lbd_auth::complete_onboarding(&user.account_id)
        .await
        .into_response_error("Failed to complete onboarding")?;

    Ok(Json(json!({
        "message": "Onboarding completed successfully!",
        "user": {
            "firebaseUid": profile.firebase_uid,
            "profile": profile.profile,
            "timeSpentMinutes": profile.onboarding.time_spent_minutes,
            "onboarding": profile.onboarding,
        }
    })))
}
