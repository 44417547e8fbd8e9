//! Input validation functions

use validator::ValidateEmail;

/// Longest address the credential table accepts
pub const MAX_EMAIL_LEN: usize = 80;

/// Validate email format
///
/// Apostrophes are refused outright even though RFC 5322 allows them in the
/// local part; stored addresses double as lookup keys in hand-written queries.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err("Email too long".to_string());
    }
    if email.contains('\'') {
        return Err("Email cannot contain '".to_string());
    }
    if !email.validate_email() {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}
