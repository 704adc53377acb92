//! In-memory sliding-window rate limiter.
//!
//! Keyed by an arbitrary identifier string (convention: `purpose:ip`, e.g.
//! `token_verify:203.0.113.7`). The store is an injected, explicitly-owned
//! object shared via `Arc` rather than a module-level global, so tests and
//! multi-instance deployments can substitute their own instance.
//!
//! The limiter is advisory, process-local state: it resets on restart and
//! does not coordinate across server instances.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use crate::types::Timestamp;

/// Tracking record for one identifier within the current window.
#[derive(Debug, Clone)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: Timestamp,
    pub first_attempt_at: Timestamp,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Attempts left in the current window (0 when rejected).
    pub remaining: u32,
    pub reset_at: Timestamp,
    /// Seconds until the window resets; set only on rejection.
    pub retry_after_secs: Option<u64>,
}

/// Process-wide sliding-window counter store.
#[derive(Debug, Default)]
pub struct RateLimiter {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check (and count) one attempt for `identifier`.
    pub fn check(&self, identifier: &str, max_attempts: u32, window: Duration) -> RateLimitDecision {
        self.check_at(identifier, max_attempts, window, Utc::now())
    }

    /// Clock-injected variant of [`check`](Self::check), used by tests.
    pub fn check_at(
        &self,
        identifier: &str,
        max_attempts: u32,
        window: Duration,
        now: Timestamp,
    ) -> RateLimitDecision {
        let mut records = self.records.lock().expect("rate limiter lock poisoned");

        // No record, or the previous window has elapsed: start fresh.
        let window_open = records
            .get(identifier)
            .is_some_and(|record| now <= record.reset_at);
        if !window_open {
            return Self::fresh_window(&mut records, identifier, max_attempts, window, now);
        }

        let record = records
            .get_mut(identifier)
            .expect("open window implies a record");

        // Window still open and budget exhausted: reject.
        if record.count >= max_attempts {
            let retry_after = (record.reset_at - now).num_seconds().max(1) as u64;
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: record.reset_at,
                retry_after_secs: Some(retry_after),
            };
        }

        // Window still open: count the attempt.
        record.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: max_attempts - record.count,
            reset_at: record.reset_at,
            retry_after_secs: None,
        }
    }

    fn fresh_window(
        records: &mut HashMap<String, RateLimitRecord>,
        identifier: &str,
        max_attempts: u32,
        window: Duration,
        now: Timestamp,
    ) -> RateLimitDecision {
        let reset_at = now + chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        records.insert(
            identifier.to_string(),
            RateLimitRecord {
                count: 1,
                reset_at,
                first_attempt_at: now,
            },
        );
        RateLimitDecision {
            allowed: true,
            remaining: max_attempts.saturating_sub(1),
            reset_at,
            retry_after_secs: None,
        }
    }

    /// Reset the counter for `identifier`, e.g. after a successful login so
    /// earlier failed attempts stop penalizing a legitimate user.
    pub fn clear(&self, identifier: &str) {
        self.records
            .lock()
            .expect("rate limiter lock poisoned")
            .remove(identifier);
    }

    /// Read the current record without counting an attempt. Expired records
    /// are dropped and reported as absent.
    pub fn status(&self, identifier: &str) -> Option<RateLimitRecord> {
        let mut records = self.records.lock().expect("rate limiter lock poisoned");
        match records.get(identifier) {
            Some(record) if Utc::now() > record.reset_at => {
                records.remove(identifier);
                None
            }
            Some(record) => Some(record.clone()),
            None => None,
        }
    }

    /// Drop all records whose window has elapsed. Returns how many were
    /// removed. Driven by a periodic background sweep to bound memory.
    pub fn sweep_expired(&self, now: Timestamp) -> usize {
        let mut records = self.records.lock().expect("rate limiter lock poisoned");
        let before = records.len();
        records.retain(|_, record| now <= record.reset_at);
        before - records.len()
    }
}
