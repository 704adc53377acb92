//! Route definitions for the `/admin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST /login                                  -> login
/// POST /clients/{client_id}/tokens             -> generate_token (editor)
/// GET  /clients/{client_id}/tokens             -> list_tokens
/// POST /clients/{client_id}/tokens/revoke-all  -> revoke_all_tokens (editor)
/// POST /tokens/revoke                          -> revoke_token (editor)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(admin::login))
        .route(
            "/clients/{client_id}/tokens",
            post(admin::generate_token).get(admin::list_tokens),
        )
        .route(
            "/clients/{client_id}/tokens/revoke-all",
            post(admin::revoke_all_tokens),
        )
        .route("/tokens/revoke", post(admin::revoke_token))
}
