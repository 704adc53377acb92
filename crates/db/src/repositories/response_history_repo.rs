//! Repository for the append-only `response_history` table.

use sqlx::PgPool;
use srs_core::types::DbId;

use crate::models::response_history::ResponseHistoryEntry;

/// Provides append/read operations on response audit snapshots.
pub struct ResponseHistoryRepo;

impl ResponseHistoryRepo {
    /// Append an immutable snapshot for a response row.
    ///
    /// Callers invoke this best-effort after an upsert; a failure here must
    /// never fail the upsert.
    pub async fn append(
        pool: &PgPool,
        response_id: DbId,
        snapshot: serde_json::Value,
    ) -> Result<ResponseHistoryEntry, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO response_history (response_id, snapshot)
             VALUES ($1, $2)
             RETURNING id, response_id, snapshot, created_at",
        )
        .bind(response_id)
        .bind(snapshot)
        .fetch_one(pool)
        .await
    }

    /// List snapshots for a response, newest first.
    pub async fn list_for_response(
        pool: &PgPool,
        response_id: DbId,
    ) -> Result<Vec<ResponseHistoryEntry>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, response_id, snapshot, created_at
             FROM response_history
             WHERE response_id = $1 ORDER BY created_at DESC",
        )
        .bind(response_id)
        .fetch_all(pool)
        .await
    }
}
