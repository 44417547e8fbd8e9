//! Business logic services
//!
//! Services coordinate the auth primitives and the stores; routes stay thin.

pub mod auth;
pub mod session_cleaner;

pub use auth::{AuthService, IssuedToken};
pub use session_cleaner::SessionCleaner;
