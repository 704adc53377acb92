//! Access-token generation and format gating.
//!
//! Tokens are opaque random strings that replace guessable questionnaire
//! URLs. They carry no structure; all semantics (client association,
//! expiry, revocation) live in the database row.

use rand::Rng;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of a generated token string (32 hex chars = 128 bits of entropy).
pub const TOKEN_LENGTH: usize = 32;

/// Tokens expire this many days after creation.
pub const TOKEN_VALIDITY_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate a new cryptographically random access token.
///
/// Returns a lowercase hex string of [`TOKEN_LENGTH`] characters.
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_LENGTH / 2] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Cheap format gate applied before any rate-limit or store lookup.
///
/// Accepts exactly [`TOKEN_LENGTH`] ASCII hex characters (either case, since
/// tokens may round-trip through user agents that normalize case).
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
