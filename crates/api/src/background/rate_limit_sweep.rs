//! Periodic cleanup of expired rate-limit records.
//!
//! Spawns a background task that drops records whose window has elapsed so
//! the in-memory map stays bounded. Runs on a fixed interval using
//! `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use srs_core::rate_limit::RateLimiter;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Run the rate-limit sweep loop until `cancel` is triggered.
pub async fn run(limiter: Arc<RateLimiter>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Rate-limit sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate-limit sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = limiter.sweep_expired(Utc::now());
                if removed > 0 {
                    tracing::debug!(removed, "Rate-limit sweep: dropped expired records");
                }
            }
        }
    }
}
