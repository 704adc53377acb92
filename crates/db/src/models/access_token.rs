//! Questionnaire access-token entity model.

use serde::Serialize;
use sqlx::FromRow;
use srs_core::types::{DbId, Timestamp};

/// A row from the `questionnaire_access_tokens` table.
///
/// Tokens are never deleted; revocation is a one-way flag so the access
/// trail (`accessed_at`, `access_count`) survives.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessToken {
    pub id: DbId,
    pub client_id: String,
    pub questionnaire_id: String,
    pub token: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub accessed_at: Option<Timestamp>,
    pub access_count: i32,
    pub revoked: bool,
}

impl AccessToken {
    /// Whether the token is currently usable.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        !self.revoked && now <= self.expires_at
    }
}

/// Safe admin-facing token info (never exposes the token itself).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessTokenInfo {
    pub id: DbId,
    pub questionnaire_id: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub accessed_at: Option<Timestamp>,
    pub access_count: i32,
    pub revoked: bool,
}
