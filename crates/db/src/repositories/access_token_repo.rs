//! Repository for the `questionnaire_access_tokens` table.

use sqlx::PgPool;
use srs_core::token::{generate_token, TOKEN_VALIDITY_DAYS};
use srs_core::types::DbId;

use crate::models::access_token::{AccessToken, AccessTokenInfo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, questionnaire_id, token, created_at, \
    expires_at, accessed_at, access_count, revoked";

/// Provides operations on questionnaire access tokens.
pub struct AccessTokenRepo;

impl AccessTokenRepo {
    /// Mint a new token for a client/questionnaire pairing.
    ///
    /// The token value is generated here so callers never supply their own;
    /// expiry is fixed at creation time.
    pub async fn create(
        pool: &PgPool,
        client_id: &str,
        questionnaire_id: &str,
    ) -> Result<AccessToken, sqlx::Error> {
        let token = generate_token();
        let query = format!(
            "INSERT INTO questionnaire_access_tokens (client_id, questionnaire_id, token, expires_at)
             VALUES ($1, $2, $3, NOW() + make_interval(days => $4))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(client_id)
            .bind(questionnaire_id)
            .bind(&token)
            .bind(TOKEN_VALIDITY_DAYS as i32)
            .fetch_one(pool)
            .await
    }

    /// Look up a token by its opaque value.
    ///
    /// Returns revoked/expired rows too; the verifier decides what they mean
    /// so that every failure mode produces the same external response.
    pub async fn find_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM questionnaire_access_tokens WHERE token = $1");
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Record a successful verification: stamp `accessed_at`, bump the count.
    ///
    /// Callers invoke this fire-and-forget; a failure here must never fail
    /// the verification itself.
    pub async fn record_access(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE questionnaire_access_tokens
             SET accessed_at = NOW(), access_count = access_count + 1
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke a single token. Idempotent; returns `true` if a row flipped.
    pub async fn revoke(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE questionnaire_access_tokens SET revoked = true
             WHERE token = $1 AND revoked = false",
        )
        .bind(token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every live token for a client. Returns the count revoked.
    pub async fn revoke_all_for_client(
        pool: &PgPool,
        client_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE questionnaire_access_tokens SET revoked = true
             WHERE client_id = $1 AND revoked = false",
        )
        .bind(client_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List a client's tokens, newest first (safe info only).
    pub async fn list_by_client(
        pool: &PgPool,
        client_id: &str,
    ) -> Result<Vec<AccessTokenInfo>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, questionnaire_id, created_at, expires_at, accessed_at, \
             access_count, revoked
             FROM questionnaire_access_tokens
             WHERE client_id = $1 ORDER BY created_at DESC",
        )
        .bind(client_id)
        .fetch_all(pool)
        .await
    }
}
