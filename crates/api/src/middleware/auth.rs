//! JWT-based admin authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use srs_core::error::CoreError;
use srs_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated admin extracted from a JWT Bearer token in the
/// `Authorization` header.
///
/// Use this as an extractor parameter in any handler that requires admin
/// authentication:
///
/// ```ignore
/// async fn my_handler(admin: AuthAdmin) -> AppResult<Json<()>> {
///     tracing::info!(admin_id = admin.admin_id, role = %admin.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    /// The admin's internal database id (from `claims.sub`).
    pub admin_id: DbId,
    /// The admin's role name (e.g. `"super_admin"`, `"admin"`, `"viewer"`).
    pub role: String,
}

impl AuthAdmin {
    /// Reject read-only roles from mutating endpoints.
    pub fn require_editor(&self) -> Result<(), AppError> {
        if self.role == srs_db::models::admin_user::ROLE_VIEWER {
            return Err(AppError::Core(CoreError::Forbidden(
                "Viewer role cannot perform this action".into(),
            )));
        }
        Ok(())
    }
}

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthAdmin {
            admin_id: claims.sub,
            role: claims.role,
        })
    }
}
