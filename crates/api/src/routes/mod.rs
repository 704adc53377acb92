pub mod admin;
pub mod health;
pub mod questionnaire;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /questionnaire/verify-token                      verify access token (public)
/// /questionnaire/{client_id}                       get, upsert response (public)
///
/// /admin/login                                     login (public, rate limited)
/// /admin/clients/{client_id}/tokens                generate, list (admin)
/// /admin/clients/{client_id}/tokens/revoke-all     revoke all (admin)
/// /admin/tokens/revoke                             revoke one (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/questionnaire", questionnaire::router())
        .nest("/admin", admin::router())
}
