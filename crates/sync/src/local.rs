//! Local snapshot persistence.
//!
//! The snapshot is an opaque serialized blob keyed by the questionnaire and
//! client identifiers. The format is not a public contract; anything that
//! fails to decode is treated as absent, never as an error the UI sees.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Build the storage key for a `(questionnaire, client)` pairing.
pub fn snapshot_key(questionnaire_id: &str, client_id: &str) -> String {
    format!("questionnaire_{questionnaire_id}_{client_id}")
}

/// Where the engine persists its local snapshot.
///
/// Writes are synchronous and strictly ordered by call sequence; that is
/// what makes local state survive even when every network push fails.
pub trait SnapshotStore: Send + Sync {
    /// Load the raw blob for `key`, or `None` if absent/unreadable.
    fn load(&self, key: &str) -> Option<String>;

    /// Persist the raw blob for `key`.
    fn save(&self, key: &str, blob: &str) -> std::io::Result<()>;

    /// Remove the blob for `key`, if present.
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

/// Snapshot store backed by one file per key under a data directory.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn save(&self, key: &str, blob: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), blob)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory snapshot store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw blob, bypassing the engine (test setup helper).
    pub fn seed(&self, key: &str, blob: &str) {
        self.entries
            .lock()
            .expect("snapshot lock poisoned")
            .insert(key.to_string(), blob.to_string());
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("snapshot lock poisoned")
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, blob: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .expect("snapshot lock poisoned")
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .expect("snapshot lock poisoned")
            .remove(key);
        Ok(())
    }
}
