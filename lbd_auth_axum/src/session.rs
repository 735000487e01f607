use async_trait::async_trait;
use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use http::{StatusCode, request::Parts};
use std::sync::Arc;

use super::error::error_body;
use lbd_auth::{TokenVerificationError, VerifiedToken, verify_id_token};

/// Checks the bearer token of an API request
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenVerificationError>;
}

/// Verifies tokens against the identity provider's published signing keys
pub struct JwksVerifier;

#[async_trait]
impl IdTokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenVerificationError> {
        verify_id_token(token).await
    }
}

/// Shared state of the API router
#[derive(Clone)]
pub struct ApiState {
    pub verifier: Arc<dyn IdTokenVerifier>,
}

impl ApiState {
    pub fn new(verifier: Arc<dyn IdTokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl Default for ApiState {
    fn default() -> Self {
        Self::new(Arc::new(JwksVerifier))
    }
}

pub enum AuthRejection {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingToken => {
                (StatusCode::UNAUTHORIZED, error_body("No token provided")).into_response()
            }
            Self::InvalidToken => {
                (StatusCode::FORBIDDEN, error_body("Invalid or expired token")).into_response()
            }
        }
    }
}

/// Account behind a verified `Authorization: Bearer` id token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub account_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub identity: VerifiedToken,
}

impl From<VerifiedToken> for AuthUser {
    fn from(identity: VerifiedToken) -> Self {
        Self {
            account_id: identity.uid.clone(),
            email: identity.email.clone(),
            email_verified: identity.email_verified,
            identity,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                tracing::debug!("No bearer token in request");
                AuthRejection::MissingToken
            })?;

        let state = ApiState::from_ref(state);
        let identity = state.verifier.verify(bearer.token()).await.map_err(|e| {
            tracing::warn!(error = %e, "Token verification failed");
            AuthRejection::InvalidToken
        })?;

        Ok(AuthUser::from(identity))
    }
}
