//! Format gate for client and questionnaire identifiers.
//!
//! Identifiers appear in URL paths, request bodies, and local snapshot keys,
//! so the accepted alphabet is deliberately narrow: ASCII alphanumerics,
//! hyphens, and underscores, bounded length. Anything else is rejected
//! before the request touches the rate limiter or the store.

use crate::error::CoreError;

/// Maximum accepted identifier length.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate a client or questionnaire identifier.
///
/// `label` names the field in the error message (e.g. `"client_id"`).
pub fn validate_identifier(value: &str, label: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{label} must not be empty")));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(CoreError::Validation(format!(
            "{label} must be at most {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "{label} may only contain letters, digits, hyphens, and underscores"
        )));
    }
    Ok(())
}
