//! lbd_auth_axum - Axum integration for lbd-auth
//!
//! Bearer-token authentication and the onboarding REST API.

mod config;
mod error;
mod health;
mod onboarding;
mod router;
mod session;

pub use config::{ALLOWED_ORIGINS, LBD_API_PREFIX, LBD_ENVIRONMENT};
pub use error::{ApiError, IntoResponseError};
pub use health::HealthResponse;
pub use router::{cors_layer, lbd_api_router, lbd_api_router_no_trace};
pub use session::{ApiState, AuthRejection, AuthUser, IdTokenVerifier, JwksVerifier};

// Re-export the initialization function from lbd_auth
pub use lbd_auth::init;
