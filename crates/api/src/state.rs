use std::sync::Arc;

use srs_core::rate_limit::RateLimiter;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. `None` when no backing store is configured;
    /// questionnaire endpoints then answer with the fallback sentinel and
    /// clients operate on local storage alone.
    pub pool: Option<srs_db::DbPool>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Process-wide rate-limit store, injected so tests own their instance.
    pub rate_limiter: Arc<RateLimiter>,
}
