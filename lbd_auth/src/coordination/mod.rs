//! Account linking coordination
//!
//! When a sign-in collides with an email that another provider already owns,
//! the [`ConflictResolver`] re-authenticates with that provider and merges the
//! pending credential into the existing account.
//!
//! - `errors`: user-facing linking failures
//! - `linking`: the resolver state machine

mod errors;
mod linking;

pub use errors::LinkingError;
pub use linking::{
    ConflictResolver, LinkOutcome, LinkPlan, LinkingState, ProviderSource,
    extract_collision_email,
};
