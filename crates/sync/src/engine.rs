//! The questionnaire sync engine.
//!
//! State flows one way: the UI mutates through [`SyncEngine::update_state`],
//! every mutation lands synchronously in the local snapshot store, and a
//! single debounced task pushes the latest state to the remote store after
//! a quiet period. Arming the debounce cancels any previously pending
//! timer, so at most one debounced push is ever outstanding — that is what
//! keeps remote writes from racing each other within a session.
//!
//! Network failures are absorbed into status flags; nothing in here throws
//! toward the UI.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use srs_core::questionnaire::{has_more_progress, merge, QuestionnaireState, StatePatch};
use srs_core::types::Timestamp;

use crate::local::{snapshot_key, SnapshotStore};
use crate::remote::{PushOutcome, RemoteFetch, RemoteStore};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet period before a debounced push fires.
    pub debounce: Duration,
    /// Total push attempts before a sync run counts as failed.
    pub max_attempts: u32,
    /// Backoff delays between attempts; the last entry repeats if
    /// `max_attempts` exceeds the schedule.
    pub retry_delays: Vec<Duration>,
    /// Consecutive failed sync runs before the offline flag flips.
    pub offline_after_failures: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            max_attempts: 3,
            retry_delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            offline_after_failures: 2,
        }
    }
}

/// Observable engine status for the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub is_loading: bool,
    pub is_online: bool,
    pub is_syncing: bool,
    pub last_synced_at: Option<Timestamp>,
    /// User-facing sync error, if any. Never fatal.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Sync engine for one `(client, questionnaire)` session.
///
/// Cheap to clone; clones share the same session.
pub struct SyncEngine<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for SyncEngine<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<R> {
    client_id: String,
    questionnaire_id: String,
    snapshots: Arc<dyn SnapshotStore>,
    remote: R,
    config: SyncConfig,

    state: Mutex<QuestionnaireState>,
    is_loading: AtomicBool,
    is_online: AtomicBool,
    is_syncing: AtomicBool,
    consecutive_failures: AtomicU32,
    last_synced_at: Mutex<Option<Timestamp>>,
    error: Mutex<Option<String>>,
    /// Abort handle for the single pending debounced push, if any.
    pending_push: Mutex<Option<tokio::task::AbortHandle>>,
}

impl<R: RemoteStore + 'static> SyncEngine<R> {
    pub fn new(
        client_id: impl Into<String>,
        questionnaire_id: impl Into<String>,
        snapshots: Arc<dyn SnapshotStore>,
        remote: R,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client_id: client_id.into(),
                questionnaire_id: questionnaire_id.into(),
                snapshots,
                remote,
                config,
                state: Mutex::new(QuestionnaireState::default()),
                is_loading: AtomicBool::new(true),
                is_online: AtomicBool::new(true),
                is_syncing: AtomicBool::new(false),
                consecutive_failures: AtomicU32::new(0),
                last_synced_at: Mutex::new(None),
                error: Mutex::new(None),
                pending_push: Mutex::new(None),
            }),
        }
    }

    // -- Initialization ----------------------------------------------------

    /// Initialize the session: reconcile the local snapshot against the
    /// remote store and transition to Ready.
    ///
    /// 1. Read the local snapshot (corrupt data counts as absent).
    /// 2. Read the remote store.
    /// 3. With no remote record (or no store at all), adopt local/default.
    /// 4. With a remote record, the progress comparator picks the winner.
    /// 5. Persist the winner locally; if local was ahead, push it back to
    ///    heal a store that fell behind.
    pub async fn load(&self) {
        let inner = &self.inner;
        let local = inner.load_local();

        match inner
            .remote
            .fetch(&inner.client_id, &inner.questionnaire_id)
            .await
        {
            Ok(RemoteFetch::Found(remote_state)) => {
                let reconciled = merge(local.as_ref(), &remote_state);
                *inner.state.lock().expect("state lock poisoned") = reconciled.clone();
                inner.persist_local(&reconciled);

                inner.is_online.store(true, Ordering::Relaxed);
                *inner
                    .last_synced_at
                    .lock()
                    .expect("last_synced_at lock poisoned") = Some(Utc::now());

                let local_was_ahead = local
                    .as_ref()
                    .is_some_and(|l| has_more_progress(l, &remote_state));
                if local_was_ahead {
                    tracing::info!(
                        client_id = %inner.client_id,
                        "Local snapshot ahead of store, pushing reconciled state back"
                    );
                    Inner::push_with_retry(inner).await;
                }
            }
            Ok(RemoteFetch::Fallback) => {
                // No backing store configured: local-only, but still online.
                tracing::info!("Server sync disabled, operating on local snapshot only");
                inner.is_online.store(true, Ordering::Relaxed);
                if let Some(local) = local {
                    *inner.state.lock().expect("state lock poisoned") = local;
                }
            }
            Ok(RemoteFetch::Missing) => {
                inner.is_online.store(true, Ordering::Relaxed);
                if let Some(local) = local {
                    *inner.state.lock().expect("state lock poisoned") = local;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch remote state, starting from local");
                inner.is_online.store(false, Ordering::Relaxed);
                if let Some(local) = local {
                    *inner.state.lock().expect("state lock poisoned") = local;
                }
            }
        }

        inner.is_loading.store(false, Ordering::Relaxed);
    }

    // -- Reads -------------------------------------------------------------

    /// Snapshot of the current state.
    pub fn state(&self) -> QuestionnaireState {
        self.inner.state.lock().expect("state lock poisoned").clone()
    }

    /// Snapshot of the status flags.
    pub fn status(&self) -> SyncStatus {
        let inner = &self.inner;
        SyncStatus {
            is_loading: inner.is_loading.load(Ordering::Relaxed),
            is_online: inner.is_online.load(Ordering::Relaxed),
            is_syncing: inner.is_syncing.load(Ordering::Relaxed),
            last_synced_at: *inner
                .last_synced_at
                .lock()
                .expect("last_synced_at lock poisoned"),
            error: inner.error.lock().expect("error lock poisoned").clone(),
        }
    }

    // -- Updates -----------------------------------------------------------

    /// Merge a partial update, persist locally, and (re)arm the debounced
    /// push. Never blocks on the network and never fails toward the caller.
    pub fn update_state(&self, patch: &StatePatch) {
        let merged = {
            let mut state = self.inner.state.lock().expect("state lock poisoned");
            patch.apply_to(&mut state);
            state.clone()
        };

        // Local persistence is synchronous: the answer is safe before any
        // network activity is even scheduled.
        self.inner.persist_local(&merged);

        self.arm_debounce();
    }

    /// Cancel any pending debounce and push the current state immediately,
    /// awaiting completion. Used before navigation/unmount.
    pub async fn force_sync(&self) {
        self.cancel_pending();
        Inner::push_with_retry(&self.inner).await;
    }

    /// Best-effort final delivery for page unload: cancel the debounce and
    /// fire one push without retries, not awaited.
    pub fn flush_on_unload(&self) {
        self.cancel_pending();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let state = inner.state.lock().expect("state lock poisoned").clone();
            if let Err(e) = inner
                .remote
                .push(&inner.client_id, &inner.questionnaire_id, &state)
                .await
            {
                tracing::debug!(error = %e, "Unload beacon push failed");
            }
        });
    }

    /// Record a connectivity transition. Going online triggers an immediate
    /// push to catch up after the gap; going offline only flips the flag.
    pub fn set_online(&self, online: bool) {
        self.inner.is_online.store(online, Ordering::Relaxed);
        if online {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                Inner::push_with_retry(&inner).await;
            });
        }
    }

    // -- Debounce plumbing -------------------------------------------------

    /// Arm the debounce timer, cancelling any previously pending one so at
    /// most one debounced push is outstanding.
    fn arm_debounce(&self) {
        let inner = Arc::clone(&self.inner);
        let debounce = self.inner.config.debounce;

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // The timer has fired; from here the push is in flight and no
            // longer cancellable (cancellation only covers the quiet period).
            *inner
                .pending_push
                .lock()
                .expect("pending_push lock poisoned") = None;
            Inner::push_with_retry(&inner).await;
        });

        let mut pending = self
            .inner
            .pending_push
            .lock()
            .expect("pending_push lock poisoned");
        if let Some(previous) = pending.replace(task.abort_handle()) {
            previous.abort();
        }
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self
            .inner
            .pending_push
            .lock()
            .expect("pending_push lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

impl<R: RemoteStore> Inner<R> {
    /// Decode the local snapshot; corrupt or missing data is just absent.
    fn load_local(&self) -> Option<QuestionnaireState> {
        let key = snapshot_key(&self.questionnaire_id, &self.client_id);
        let blob = self.snapshots.load(&key)?;
        match serde_json::from_str(&blob) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable local snapshot");
                None
            }
        }
    }

    /// Persist the state locally. Failure here is the one data-loss risk the
    /// engine cannot absorb, so it is logged loudly — but still never
    /// propagated to the caller.
    fn persist_local(&self, state: &QuestionnaireState) {
        let key = snapshot_key(&self.questionnaire_id, &self.client_id);
        let blob = match serde_json::to_string(state) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize local snapshot");
                return;
            }
        };
        if let Err(e) = self.snapshots.save(&key, &blob) {
            tracing::error!(error = %e, "Failed to persist local snapshot; progress is at risk");
        }
    }

    /// Push the state captured at call time, retrying on the backoff
    /// schedule. Returns whether the run ultimately succeeded.
    async fn push_with_retry(inner: &Arc<Self>) -> bool {
        inner.is_syncing.store(true, Ordering::Relaxed);
        *inner.error.lock().expect("error lock poisoned") = None;

        // Captured once: a slow retry applies this state, not whatever the
        // session moved on to (last-applied-wins at the store row).
        let state = inner.state.lock().expect("state lock poisoned").clone();

        let mut attempt: u32 = 0;
        loop {
            match inner
                .remote
                .push(&inner.client_id, &inner.questionnaire_id, &state)
                .await
            {
                Ok(outcome) => {
                    inner.consecutive_failures.store(0, Ordering::Relaxed);
                    inner.is_online.store(true, Ordering::Relaxed);
                    match outcome {
                        PushOutcome::Stored => {
                            *inner
                                .last_synced_at
                                .lock()
                                .expect("last_synced_at lock poisoned") = Some(Utc::now());
                        }
                        PushOutcome::Fallback => {
                            tracing::debug!("Server sync disabled, push became a no-op");
                        }
                    }
                    inner.is_syncing.store(false, Ordering::Relaxed);
                    return true;
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= inner.config.max_attempts {
                        tracing::warn!(error = %e, attempt, "Sync failed, retries exhausted");
                        break;
                    }
                    let delay = inner
                        .config
                        .retry_delays
                        .get(attempt as usize - 1)
                        .or(inner.config.retry_delays.last())
                        .copied()
                        .unwrap_or(Duration::from_secs(4));
                    tracing::warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "Sync attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // All attempts failed. Only repeated whole-run failures flip the
        // offline flag; a single blip stays invisible.
        let failures = inner.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= inner.config.offline_after_failures {
            *inner.error.lock().expect("error lock poisoned") =
                Some("Sync pending - changes saved locally".to_string());
            inner.is_online.store(false, Ordering::Relaxed);
        } else {
            tracing::warn!(failures, "Transient sync failure, keeping online status");
        }
        inner.is_syncing.store(false, Ordering::Relaxed);
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
