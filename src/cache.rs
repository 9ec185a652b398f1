//! Session cache over an opaque persisted keyed store.
//!
//! The store itself (keychain, encrypted prefs, ...) is a collaborator, not
//! ours: the crate only needs `get`/`set`/`remove` on byte blobs. Anything
//! that fails to read or decode degrades to "no cache" — a corrupted blob
//! must never crash initialization.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::model::OnboardingPayload;

const PAYLOAD_KEY: &str = "onboarding";
const STARTED_KEY: &str = "hasStartedOnboarding";

/// Opaque persisted keyed blob store.
pub trait BlobStore: Send + Sync {
    /// `None` when the key is absent or unreadable.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, value: Vec<u8>);
    fn remove(&self, key: &str);
}

/// In-memory store for tests and the offline demo mode.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// One-file-per-key store rooted at a directory. I/O failures degrade to
/// absent values with a warning.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers, but sanitize anyway so a hostile key
        // cannot escape the store directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(safe)
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            warn!(error = %err, "failed to create blob store directory");
            return;
        }
        if let Err(err) = std::fs::write(self.path_for(key), value) {
            warn!(key, error = %err, "failed to persist blob");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = std::fs::remove_file(self.path_for(key)) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(key, error = %err, "failed to remove blob");
            }
        }
    }
}

/// Caches the last successfully fetched payload and the has-started flag.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn BlobStore>,
}

impl SessionCache {
    /// Wrap a store. If onboarding has never been started on this device,
    /// any stale payload blob is cleared up front.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        let cache = Self { store };
        if !cache.has_started() {
            cache.set_payload(None);
        }
        cache
    }

    /// The cached payload, or `None` when absent or undecodable.
    pub fn payload(&self) -> Option<OnboardingPayload> {
        let bytes = self.store.get(PAYLOAD_KEY)?;
        match serde_json::from_slice(&bytes) {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!(error = %err, "cached onboarding payload is corrupted, ignoring");
                None
            }
        }
    }

    /// Replace the cached payload wholesale. `None` removes the key rather
    /// than storing a null marker.
    pub fn set_payload(&self, payload: Option<&OnboardingPayload>) {
        match payload {
            Some(payload) => match serde_json::to_vec(payload) {
                Ok(bytes) => self.store.set(PAYLOAD_KEY, bytes),
                Err(err) => warn!(error = %err, "failed to encode payload for caching"),
            },
            None => self.store.remove(PAYLOAD_KEY),
        }
    }

    pub fn has_started(&self) -> bool {
        self.store
            .get(STARTED_KEY)
            .is_some_and(|bytes| bytes == b"1")
    }

    /// Set once; never reset.
    pub fn set_started(&self) {
        self.store.set(STARTED_KEY, b"1".to_vec());
    }
}
