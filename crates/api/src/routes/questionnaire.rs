//! Route definitions for the `/questionnaire` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::questionnaire;
use crate::state::AppState;

/// Routes mounted at `/questionnaire`.
///
/// ```text
/// POST /verify-token   -> verify_token
/// GET  /{client_id}    -> get_response
/// POST /{client_id}    -> upsert_response
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify-token", post(questionnaire::verify_token))
        .route(
            "/{client_id}",
            get(questionnaire::get_response).post(questionnaire::upsert_response),
        )
}
