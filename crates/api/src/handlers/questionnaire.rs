//! Handlers for the `/questionnaire` resource: token verification and
//! response read/upsert.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use srs_core::error::CoreError;
use srs_core::identifier::validate_identifier;
use srs_core::questionnaire::QuestionnaireState;
use srs_core::rate_limit::RateLimitDecision;
use srs_core::token;
use srs_db::repositories::{AccessTokenRepo, ResponseHistoryRepo, ResponseRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientIp;
use crate::state::AppState;

/// Maximum token-verification attempts per IP per window.
const MAX_VERIFY_ATTEMPTS: u32 = 10;

/// Token-verification rate-limit window.
const VERIFY_WINDOW: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /questionnaire/verify-token`.
#[derive(Debug, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

/// Successful verification response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub client_id: String,
    pub questionnaire_id: String,
}

/// Query parameters for `GET /questionnaire/{client_id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseQuery {
    #[serde(default = "default_questionnaire_id")]
    pub questionnaire_id: String,
}

fn default_questionnaire_id() -> String {
    "discovery".to_string()
}

/// Request body for `POST /questionnaire/{client_id}`: the questionnaire id
/// plus a full state payload, flattened the way the sync engine sends it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponseRequest {
    #[serde(default = "default_questionnaire_id")]
    pub questionnaire_id: String,
    #[serde(flatten)]
    pub state: QuestionnaireState,
}

// ---------------------------------------------------------------------------
// Token verification
// ---------------------------------------------------------------------------

/// POST /api/v1/questionnaire/verify-token
///
/// Authorize access to a questionnaire via an opaque access token.
/// Every failure mode after the format gate answers with the same 401 body
/// so callers cannot distinguish unknown, revoked, and expired tokens.
pub async fn verify_token(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(input): Json<VerifyTokenRequest>,
) -> AppResult<Response> {
    // 1. Format gate: reject malformed tokens before the rate limiter or
    //    store see them.
    if !token::is_well_formed(&input.token) {
        return Err(AppError::Core(CoreError::Validation(
            "Invalid token format".into(),
        )));
    }

    // 2. Rate limit per IP.
    let decision = state.rate_limiter.check(
        &format!("token_verify:{ip}"),
        MAX_VERIFY_ATTEMPTS,
        VERIFY_WINDOW,
    );
    if !decision.allowed {
        return Err(AppError::RateLimited {
            limit: MAX_VERIFY_ATTEMPTS,
            retry_after_secs: decision.retry_after_secs.unwrap_or(60),
            reset_at_epoch_secs: decision.reset_at.timestamp(),
        });
    }

    // 3. The store must be configured for token verification.
    let pool = state.pool.as_ref().ok_or_else(|| {
        AppError::Core(CoreError::Unavailable("no backing store configured".into()))
    })?;

    // 4. Look up and check validity. Uniform failure body, no leakage.
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()));

    let record = AccessTokenRepo::find_by_token(pool, &input.token)
        .await?
        .ok_or_else(invalid)?;

    if !record.is_valid_at(chrono::Utc::now()) {
        return Err(invalid());
    }

    // 5. Record access telemetry fire-and-forget; a failure here must not
    //    fail the verification.
    let telemetry_pool = pool.clone();
    let token_id = record.id;
    tokio::spawn(async move {
        if let Err(e) = AccessTokenRepo::record_access(&telemetry_pool, token_id).await {
            tracing::warn!(token_id, error = %e, "Failed to record token access");
        }
    });

    let body = Json(VerifyTokenResponse {
        success: true,
        client_id: record.client_id,
        questionnaire_id: record.questionnaire_id,
    });

    Ok(with_rate_limit_headers(
        body.into_response(),
        MAX_VERIFY_ATTEMPTS,
        &decision,
    ))
}

/// Attach `X-RateLimit-*` headers to a successful response.
fn with_rate_limit_headers(
    mut response: Response,
    limit: u32,
    decision: &RateLimitDecision,
) -> Response {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", int_header(limit as i64));
    headers.insert("x-ratelimit-remaining", int_header(decision.remaining as i64));
    headers.insert("x-ratelimit-reset", int_header(decision.reset_at.timestamp()));
    response
}

fn int_header(value: i64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

// ---------------------------------------------------------------------------
// Response read / upsert
// ---------------------------------------------------------------------------

/// GET /api/v1/questionnaire/{client_id}
///
/// Returns the stored state, `data: null` when none exists, or the
/// `fallback` sentinel when no backing store is configured.
pub async fn get_response(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Query(query): Query<ResponseQuery>,
) -> AppResult<Json<serde_json::Value>> {
    validate_identifier(&client_id, "client_id")?;
    validate_identifier(&query.questionnaire_id, "questionnaire_id")?;

    let Some(pool) = state.pool.as_ref() else {
        return Ok(Json(json!({ "fallback": true })));
    };

    let row = ResponseRepo::find(pool, &client_id, &query.questionnaire_id).await?;

    match row {
        Some(row) => Ok(Json(json!({ "data": row.to_state() }))),
        None => Ok(Json(json!({ "data": null }))),
    }
}

/// POST /api/v1/questionnaire/{client_id}
///
/// Upserts a full state payload after strict shape/size validation and
/// appends a best-effort history snapshot.
pub async fn upsert_response(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(input): Json<UpsertResponseRequest>,
) -> AppResult<Json<serde_json::Value>> {
    // 1. Validate identifiers and payload before anything else.
    validate_identifier(&client_id, "client_id")?;
    validate_identifier(&input.questionnaire_id, "questionnaire_id")?;
    input.state.validate()?;

    // 2. Degrade to the fallback sentinel without a backing store.
    let Some(pool) = state.pool.as_ref() else {
        return Ok(Json(json!({ "fallback": true })));
    };

    // 3. Upsert the single live row for this pairing.
    let row = ResponseRepo::upsert(pool, &client_id, &input.questionnaire_id, &input.state).await?;

    // 4. Append an audit snapshot best-effort; failure must not fail the
    //    upsert.
    let history_pool = pool.clone();
    let response_id = row.id;
    let snapshot =
        serde_json::to_value(&input.state).unwrap_or_else(|_| serde_json::json!({}));
    tokio::spawn(async move {
        if let Err(e) = ResponseHistoryRepo::append(&history_pool, response_id, snapshot).await {
            tracing::warn!(response_id, error = %e, "Failed to append response history");
        }
    });

    Ok(Json(json!({ "data": row })))
}
