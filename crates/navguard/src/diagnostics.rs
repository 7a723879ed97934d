//! Read-only snapshot for the operator diagnostic panel.
//!
//! The panel owns its UI; this module only supplies the data contract: the
//! persisted state, whether that path is still served, the guard state, and
//! the legacy `route_hash` value, which stays absent because nothing in the
//! recovery logic writes it.

use serde::{Deserialize, Serialize};

use crate::nav_store::{KeyValueBackend, PersistedNavState};
use crate::validator::{GuardState, NavigationGuard};

/// Point-in-time view of the guard for operator tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub captured_at_millis: i64,
    pub guard_state: GuardState,
    pub route_count: usize,
    pub persisted: Option<PersistedNavState>,
    /// Whether the persisted path is still a table member; `None` when
    /// nothing is persisted.
    pub persisted_path_valid: Option<bool>,
    /// Legacy panel key; always absent until a hashing requirement exists.
    pub route_hash: Option<String>,
}

impl DiagnosticsSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<B: KeyValueBackend> NavigationGuard<B> {
    /// Capture a diagnostics snapshot. Store failures read as absent values,
    /// same as everywhere else in the guard.
    pub fn diagnostics_snapshot(&self, now_millis: i64) -> DiagnosticsSnapshot {
        let persisted = self.store.read().ok().flatten();
        let persisted_path_valid = persisted
            .as_ref()
            .map(|state| self.table.is_valid(&state.path));
        let route_hash = self.store.route_hash().ok().flatten();
        DiagnosticsSnapshot {
            captured_at_millis: now_millis,
            guard_state: self.state,
            route_count: self.table.len(),
            persisted,
            persisted_path_valid,
            route_hash,
        }
    }
}
