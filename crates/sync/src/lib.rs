//! Client-resident questionnaire sync engine.
//!
//! Owns the authoritative in-memory [`QuestionnaireState`] for one session,
//! mirrors every change to a local snapshot store, and pushes to the remote
//! response store behind a debounce so bursts of edits collapse into a
//! single network call. On load it reconciles local vs. remote state with
//! the progress comparator and heals a store that fell behind.
//!
//! [`QuestionnaireState`]: srs_core::questionnaire::QuestionnaireState

pub mod engine;
pub mod local;
pub mod remote;

pub use engine::{SyncConfig, SyncEngine, SyncStatus};
pub use local::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use remote::{HttpRemoteStore, PushOutcome, RemoteError, RemoteFetch, RemoteStore};
