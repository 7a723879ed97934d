//! Durable last-known-good navigation state.
//!
//! The store is origin-wide shared state with no locking and no cross-key
//! atomicity; concurrent writers race and last-writer-wins is accepted
//! because the value is only ever a best-effort fallback, never a
//! correctness-critical source of truth. Everything here is fallible and
//! every failure is recoverable: callers treat a failed read as an absent
//! value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key holding the last path that reached an ALLOW decision.
pub const KEY_CURRENT_ROUTE: &str = "current_route";
/// Key holding the epoch-millisecond timestamp of that decision.
pub const KEY_TIMESTAMP: &str = "timestamp";
/// Legacy key the operator panel reads. Nothing in the recovery logic ever
/// writes it; it stays absent until a hashing requirement is specified.
pub const KEY_ROUTE_HASH: &str = "route_hash";

// ---------------------------------------------------------------------------
// StoreError — recoverable backend failures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    Get,
    Set,
    Remove,
}

impl StoreOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A backend operation failed or was blocked (storage disabled, quota, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreError {
    pub operation: StoreOperation,
    pub key: String,
    pub detail: String,
}

impl StoreError {
    pub fn unavailable(
        operation: StoreOperation,
        key: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            key: key.into(),
            detail: detail.into(),
        }
    }

    pub const fn error_code(&self) -> &'static str {
        "NG-STORE-0001"
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "store error [{}]: {} {}: {}",
            self.error_code(),
            self.operation,
            self.key,
            self.detail
        )
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// KeyValueBackend — the narrow persistence seam
// ---------------------------------------------------------------------------

/// Origin-scoped durable key-value access.
///
/// This is the single seam behind which any per-origin store can sit;
/// swapping the backend never touches validator logic. Operations are
/// assumed synchronous and fast (in-process key-value access), so there is
/// no timeout machinery here.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Reference backend over a `BTreeMap`, used by tests and by hosts that want
/// process-local persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NavStore — the logical record over the two live keys
// ---------------------------------------------------------------------------

/// Last known-good navigation state as read back from the store.
///
/// The two keys are written independently, so a crash between them can leave
/// a present path with a stale or absent timestamp. `timestamp_millis` is
/// therefore optional; callers must tolerate its absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedNavState {
    pub path: String,
    pub timestamp_millis: Option<i64>,
}

/// Persistent navigation store over a [`KeyValueBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> NavStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Record an ALLOW decision. The two keys are set independently; there is
    /// no atomicity across them.
    pub fn write(&mut self, path: &str, timestamp_millis: i64) -> Result<(), StoreError> {
        self.backend.set(KEY_CURRENT_ROUTE, path)?;
        self.backend.set(KEY_TIMESTAMP, &timestamp_millis.to_string())
    }

    /// Read the persisted state, if any.
    ///
    /// A readable path with a missing, unreadable, or garbled timestamp still
    /// yields a state; only a missing path yields `None`.
    pub fn read(&self) -> Result<Option<PersistedNavState>, StoreError> {
        let Some(path) = self.backend.get(KEY_CURRENT_ROUTE)? else {
            return Ok(None);
        };
        let timestamp_millis = match self.backend.get(KEY_TIMESTAMP) {
            Ok(Some(raw)) => raw.parse::<i64>().ok(),
            Ok(None) | Err(_) => None,
        };
        Ok(Some(PersistedNavState {
            path,
            timestamp_millis,
        }))
    }

    /// Clear all store keys, the legacy hash key included.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.remove(KEY_CURRENT_ROUTE)?;
        self.backend.remove(KEY_TIMESTAMP)?;
        self.backend.remove(KEY_ROUTE_HASH)
    }

    /// The legacy `route_hash` value. Always absent in practice; exposed so
    /// the diagnostics boundary reports what the panel would see.
    pub fn route_hash(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(KEY_ROUTE_HASH)
    }
}
