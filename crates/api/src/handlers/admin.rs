//! Handlers for the `/admin` resource: login and access-token management.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use srs_core::error::CoreError;
use srs_core::identifier::validate_identifier;
use srs_core::token;
use srs_core::types::{DbId, Timestamp};
use srs_db::models::access_token::AccessTokenInfo;
use srs_db::repositories::{AccessTokenRepo, AdminUserRepo};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthAdmin;
use crate::middleware::client_ip::ClientIp;
use crate::state::AppState;

/// Maximum failed login attempts per IP per window.
const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Login rate-limit window.
const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub admin: AdminInfo,
}

/// Public admin info embedded in [`LoginResponse`].
#[derive(Debug, Serialize)]
pub struct AdminInfo {
    pub id: DbId,
    pub email: String,
    pub role: String,
}

/// Response body for token generation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTokenResponse {
    pub token: String,
    pub share_link: String,
    pub expires_at: Timestamp,
}

/// Request body for token generation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    #[serde(default = "default_questionnaire_id")]
    pub questionnaire_id: String,
}

fn default_questionnaire_id() -> String {
    "discovery".to_string()
}

/// Request body for `POST /admin/tokens/revoke`.
#[derive(Debug, Deserialize)]
pub struct RevokeTokenRequest {
    pub token: String,
}

/// Response body for revocation endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeOutcome {
    pub revoked_count: u64,
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/login
///
/// Authenticate with email + password. Failed attempts count against the
/// per-IP rate limiter; a successful login clears it so legitimate users
/// are not penalized for earlier typos.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    // 1. Rate limit per IP before any credential work.
    let limiter_key = format!("login:{ip}");
    let decision =
        state
            .rate_limiter
            .check(&limiter_key, MAX_LOGIN_ATTEMPTS, LOGIN_WINDOW);
    if !decision.allowed {
        return Err(AppError::RateLimited {
            limit: MAX_LOGIN_ATTEMPTS,
            retry_after_secs: decision.retry_after_secs.unwrap_or(60),
            reset_at_epoch_secs: decision.reset_at.timestamp(),
        });
    }

    let pool = require_pool(&state)?;

    // 2. Find the admin. Uniform failure message for unknown email and bad
    //    password.
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid email or password".into()));

    let admin = AdminUserRepo::find_by_email(pool, &input.email)
        .await?
        .ok_or_else(invalid)?;

    if !admin.active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 3. Verify password.
    let password_valid = verify_password(&input.password, &admin.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        return Err(invalid());
    }

    // 4. Success: clear the limiter, stamp the login, issue a token.
    state.rate_limiter.clear(&limiter_key);
    AdminUserRepo::record_login(pool, admin.id).await?;

    let access_token = generate_access_token(admin.id, &admin.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(Json(LoginResponse {
        access_token,
        expires_in: state.config.jwt.token_expiry_hours * 3600,
        admin: AdminInfo {
            id: admin.id,
            email: admin.email,
            role: admin.role,
        },
    }))
}

// ---------------------------------------------------------------------------
// Token management
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/clients/{client_id}/tokens
///
/// Mint a new access token for a client's questionnaire and return the
/// shareable link. Requires an editor role.
pub async fn generate_token(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(client_id): Path<String>,
    Json(input): Json<GenerateTokenRequest>,
) -> AppResult<(StatusCode, Json<GeneratedTokenResponse>)> {
    admin.require_editor()?;
    validate_identifier(&client_id, "client_id")?;
    validate_identifier(&input.questionnaire_id, "questionnaire_id")?;

    let pool = require_pool(&state)?;
    let record = AccessTokenRepo::create(pool, &client_id, &input.questionnaire_id).await?;

    tracing::info!(
        admin_id = admin.admin_id,
        client_id = %record.client_id,
        questionnaire_id = %record.questionnaire_id,
        "Generated questionnaire access token"
    );

    let share_link = format!("{}/q/{}", state.config.base_url, record.token);

    Ok((
        StatusCode::CREATED,
        Json(GeneratedTokenResponse {
            token: record.token,
            share_link,
            expires_at: record.expires_at,
        }),
    ))
}

/// GET /api/v1/admin/clients/{client_id}/tokens
///
/// List a client's tokens (never the token values themselves).
pub async fn list_tokens(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(client_id): Path<String>,
) -> AppResult<Json<Vec<AccessTokenInfo>>> {
    validate_identifier(&client_id, "client_id")?;

    let pool = require_pool(&state)?;
    let tokens = AccessTokenRepo::list_by_client(pool, &client_id).await?;
    Ok(Json(tokens))
}

/// POST /api/v1/admin/tokens/revoke
///
/// Revoke a single token. Idempotent: revoking an already-revoked or
/// unknown token reports zero rows flipped rather than an error.
pub async fn revoke_token(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Json(input): Json<RevokeTokenRequest>,
) -> AppResult<Json<RevokeOutcome>> {
    admin.require_editor()?;
    if !token::is_well_formed(&input.token) {
        return Err(AppError::Core(CoreError::Validation(
            "Invalid token format".into(),
        )));
    }

    let pool = require_pool(&state)?;
    let revoked = AccessTokenRepo::revoke(pool, &input.token).await?;

    tracing::info!(admin_id = admin.admin_id, revoked, "Revoked access token");
    Ok(Json(RevokeOutcome {
        revoked_count: u64::from(revoked),
    }))
}

/// POST /api/v1/admin/clients/{client_id}/tokens/revoke-all
///
/// Revoke every live token for a client.
pub async fn revoke_all_tokens(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(client_id): Path<String>,
) -> AppResult<Json<RevokeOutcome>> {
    admin.require_editor()?;
    validate_identifier(&client_id, "client_id")?;

    let pool = require_pool(&state)?;
    let revoked_count = AccessTokenRepo::revoke_all_for_client(pool, &client_id).await?;

    tracing::info!(
        admin_id = admin.admin_id,
        client_id = %client_id,
        revoked_count,
        "Revoked all client tokens"
    );
    Ok(Json(RevokeOutcome { revoked_count }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_pool(state: &AppState) -> Result<&srs_db::DbPool, AppError> {
    state.pool.as_ref().ok_or_else(|| {
        AppError::Core(CoreError::Unavailable("no backing store configured".into()))
    })
}
