//! Credential checks and session tokens.

pub mod gate;
pub mod token;

pub use gate::{AccessGate, AccessState, CacheStats};
pub use token::{SessionClaims, SessionToken, TokenError};
