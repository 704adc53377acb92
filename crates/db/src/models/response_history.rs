//! Immutable audit snapshots of questionnaire responses.

use serde::Serialize;
use sqlx::FromRow;
use srs_core::types::{DbId, Timestamp};

/// A row from the append-only `response_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResponseHistoryEntry {
    pub id: DbId,
    pub response_id: DbId,
    pub snapshot: serde_json::Value,
    pub created_at: Timestamp,
}
