use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;

use super::config::{FIREBASE_PROJECT_ID, LBD_TOKEN_JWKS_URL, TOKEN_ISSUER_PREFIX};

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Jwk {
    kty: String,
    kid: String,
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct FirebaseClaims {
    iss: String,
    aud: String,
    sub: String,
    iat: i64,
    exp: i64,
    nbf: Option<i64>,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    firebase: FirebaseSection,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FirebaseSection {
    sign_in_provider: Option<String>,
}

/// Identity extracted from a verified ID token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub sign_in_provider: Option<String>,
}

#[derive(Error, Debug)]
pub enum TokenVerificationError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Base64 decoding failed: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid token format")]
    InvalidTokenFormat,
    #[error("Invalid token signature")]
    InvalidTokenSignature,
    #[error("Invalid token audience, expected: {0}, actual: {1}")]
    InvalidTokenAudience(String, String),
    #[error("Invalid token issuer, expected: {0}, actual: {1}")]
    InvalidTokenIssuer(String, String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Token not yet valid, now: {0}, nbf: {1}")]
    TokenNotYetValidNotBeFore(i64, i64),
    #[error("Token not yet valid, now: {0}, iat: {1}")]
    TokenNotYetValidIssuedAt(i64, i64),
    #[error("Token has an empty subject")]
    MissingSubject,
    #[error("No matching key found in JWKS")]
    NoMatchingKey,
    #[error("Missing key component: {0}")]
    MissingKeyComponent(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
    #[error("FIREBASE_PROJECT_ID is not configured")]
    MissingProjectId,
}

const CACHE_EXPIRATION: Duration = Duration::from_secs(600);
const CLOCK_SKEW_SECS: i64 = 2;

#[derive(Clone, Debug)]
struct JwksCache {
    jwks: Jwks,
    expires_at: DateTime<Utc>,
}

static JWKS_CACHE: LazyLock<Mutex<HashMap<String, JwksCache>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

async fn fetch_jwks(jwks_url: &str) -> Result<Jwks, TokenVerificationError> {
    let mut cache = JWKS_CACHE.lock().await;

    if let Some(cached) = cache.get(jwks_url) {
        if cached.expires_at > Utc::now() {
            tracing::debug!("Returning valid cached JWKs");
            return Ok(cached.jwks.clone());
        }
        tracing::debug!("Removing expired JWKs from cache");
        cache.remove(jwks_url);
    }

    let resp = reqwest::get(jwks_url).await?.error_for_status()?;
    let jwks: Jwks = resp.json().await?;
    tracing::debug!(keys = jwks.keys.len(), "JWKs fetched from URL");

    cache.insert(
        jwks_url.to_string(),
        JwksCache {
            jwks: jwks.clone(),
            expires_at: Utc::now() + CACHE_EXPIRATION,
        },
    );

    Ok(jwks)
}

fn find_jwk<'a>(jwks: &'a Jwks, kid: &str) -> Option<&'a Jwk> {
    jwks.keys.iter().find(|key| key.kid == kid)
}

fn component<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, TokenVerificationError> {
    value
        .as_deref()
        .ok_or_else(|| TokenVerificationError::MissingKeyComponent(name.to_string()))
}

/// Build an RS256 key from a JWKS entry; any other key type is refused.
fn rsa_decoding_key(jwk: &Jwk) -> Result<DecodingKey, TokenVerificationError> {
    if jwk.kty != "RSA" {
        return Err(TokenVerificationError::UnsupportedKeyType(jwk.kty.clone()));
    }
    if let Some(jwk_alg) = &jwk.alg {
        if jwk_alg != "RS256" {
            return Err(TokenVerificationError::UnsupportedAlgorithm(jwk_alg.clone()));
        }
    }
    Ok(DecodingKey::from_rsa_components(
        component(&jwk.n, "n")?,
        component(&jwk.e, "e")?,
    )?)
}

fn split_token(token: &str) -> Result<[&str; 3], TokenVerificationError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok([header, payload, signature]),
        _ => Err(TokenVerificationError::InvalidTokenFormat),
    }
}

fn decode_claims(token: &str) -> Result<FirebaseClaims, TokenVerificationError> {
    let [_, payload, _] = split_token(token)?;
    let decoded_payload = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&decoded_payload)?)
}

fn verify_signature(
    token: &str,
    decoding_key: &DecodingKey,
    alg: Algorithm,
) -> Result<bool, TokenVerificationError> {
    let [header, payload, signature] = split_token(token)?;
    let message = format!("{header}.{payload}");
    Ok(jsonwebtoken::crypto::verify(
        signature,
        message.as_bytes(),
        decoding_key,
        alg,
    )?)
}

/// Verify an ID token against the configured project and JWKS endpoint
pub async fn verify_id_token(token: &str) -> Result<VerifiedToken, TokenVerificationError> {
    let project_id = FIREBASE_PROJECT_ID
        .as_deref()
        .ok_or(TokenVerificationError::MissingProjectId)?;
    verify_id_token_with(token, project_id, LBD_TOKEN_JWKS_URL.as_str()).await
}

/// Verify an ID token: RS256 signature by `kid`, audience, issuer and
/// validity window.
pub async fn verify_id_token_with(
    token: &str,
    project_id: &str,
    jwks_url: &str,
) -> Result<VerifiedToken, TokenVerificationError> {
    let header = jsonwebtoken::decode_header(token)?;
    let kid = header
        .kid
        .ok_or_else(|| TokenVerificationError::MissingKeyComponent("kid".to_string()))?;
    if header.alg != Algorithm::RS256 {
        return Err(TokenVerificationError::UnsupportedAlgorithm(format!(
            "{:?}",
            header.alg
        )));
    }
    let claims = decode_claims(token)?;

    tracing::debug!(kid = %kid, "Verifying ID token");

    let jwks = fetch_jwks(jwks_url).await?;
    let jwk = find_jwk(&jwks, &kid).ok_or(TokenVerificationError::NoMatchingKey)?;
    let decoding_key = rsa_decoding_key(jwk)?;
    if !verify_signature(token, &decoding_key, Algorithm::RS256)? {
        return Err(TokenVerificationError::InvalidTokenSignature);
    }

    if claims.aud != project_id {
        return Err(TokenVerificationError::InvalidTokenAudience(
            project_id.to_string(),
            claims.aud,
        ));
    }

    let expected_issuer = format!("{TOKEN_ISSUER_PREFIX}{project_id}");
    if claims.iss != expected_issuer {
        return Err(TokenVerificationError::InvalidTokenIssuer(
            expected_issuer,
            claims.iss,
        ));
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

    if let Some(nbf) = claims.nbf {
        if now + CLOCK_SKEW_SECS < nbf {
            return Err(TokenVerificationError::TokenNotYetValidNotBeFore(now, nbf));
        }
    }
    if now + CLOCK_SKEW_SECS < claims.iat {
        return Err(TokenVerificationError::TokenNotYetValidIssuedAt(
            now, claims.iat,
        ));
    }
    if now > claims.exp + CLOCK_SKEW_SECS {
        return Err(TokenVerificationError::TokenExpired);
    }

    if claims.sub.is_empty() {
        return Err(TokenVerificationError::MissingSubject);
    }

    Ok(VerifiedToken {
        uid: claims.sub,
        email: claims.email,
        email_verified: claims.email_verified,
        sign_in_provider: claims.firebase.sign_in_provider,
    })
}
