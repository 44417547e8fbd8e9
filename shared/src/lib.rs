//! Session Auth Shared Library
//!
//! Wire types and input validation shared between the backend and any
//! client that talks to the auth endpoints.

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::validate_email;
