//! Client-side session state: the signed-in account, loading and error
//! flags, and the confirmation prompt shown before linking.

mod controller;

pub use controller::{AuthSessionController, ConfirmLinking, LinkingPrompt, SessionSnapshot};
