//! Recovery control surface for operator tooling.
//!
//! Manual counterparts to the automatic recovery path: force a recovery from
//! the persisted state when automatic recovery is suspected to have failed
//! silently, or wipe the persisted state so the next unmatched navigation
//! falls straight to the default path.

use crate::nav_store::KeyValueBackend;
use crate::path_match::{match_path, PathMatch};
use crate::validator::{GuardEventKind, GuardState, NavigationGuard};

impl<B: KeyValueBackend> NavigationGuard<B> {
    /// Re-run the matcher against the currently persisted path (not the live
    /// browser path). Returns the target the host must replace-navigate to,
    /// or `None` when the store is empty, unreadable, or holds a path no
    /// longer in the table. `is_some()` is the operator-facing boolean.
    pub fn force_recovery(&mut self, now_millis: i64) -> Option<String> {
        let generation = self.generation;
        let persisted = match self.store.read() {
            Ok(persisted) => persisted,
            Err(error) => {
                self.record(
                    now_millis,
                    generation,
                    GuardEventKind::StoreFault,
                    "",
                    "read_failed",
                    Some(error.error_code().to_string()),
                );
                None
            }
        };
        let Some(state) = persisted else {
            self.record(
                now_millis,
                generation,
                GuardEventKind::ForceRecovery,
                "",
                "no_persisted_state",
                None,
            );
            return None;
        };

        // Only an exact match counts: the persisted path was written by an
        // ALLOW decision, so anything weaker means the table moved on and
        // the automatic fallback tiers own that case.
        match match_path(&state.path, &self.table) {
            PathMatch::Exact(target) => {
                self.state = GuardState::Redirecting;
                self.record(
                    now_millis,
                    generation,
                    GuardEventKind::ForceRecovery,
                    &target,
                    "pass",
                    None,
                );
                Some(target)
            }
            PathMatch::Similar(_) | PathMatch::NoMatch => {
                self.record(
                    now_millis,
                    generation,
                    GuardEventKind::ForceRecovery,
                    &state.path,
                    "no_valid_target",
                    None,
                );
                None
            }
        }
    }

    /// Clear the persisted navigation state entirely. The live route and the
    /// route table are untouched; the next NoMatch cycle falls straight to
    /// the default path.
    pub fn reset(&mut self, now_millis: i64) {
        let generation = self.generation;
        if let Err(error) = self.store.clear() {
            self.record(
                now_millis,
                generation,
                GuardEventKind::StoreFault,
                "",
                "clear_failed",
                Some(error.error_code().to_string()),
            );
        }
        self.record(
            now_millis,
            generation,
            GuardEventKind::Reset,
            "",
            "pass",
            None,
        );
    }
}
