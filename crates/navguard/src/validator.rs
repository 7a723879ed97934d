//! Navigation validation state machine.
//!
//! One guard instance validates every in-app navigation: it waits a short
//! fixed delay (so the host finishes mounting before the path is judged),
//! runs the tiered matcher, and either opens the render gate or hands the
//! host a replacement navigation. Redirects are replace-navigations — the
//! host must not push a history entry — and re-enter the guard through
//! [`NavigationGuard::on_navigation`].
//!
//! The machine is driven by explicit caller-supplied timestamps; there are
//! no threads or timers. A pending validation is keyed by a monotonically
//! increasing generation counter, so a navigation that supersedes it can
//! never have the stale decision applied.

use serde::{Deserialize, Serialize};

use crate::nav_store::{KeyValueBackend, NavStore};
use crate::path_match::{match_path, PathMatch};
use crate::route_table::RouteTable;

/// Delay between a navigation event and its validation run.
pub const DEFAULT_VALIDATION_DELAY_MILLIS: i64 = 100;
/// Upper bound on the configurable delay.
pub const MAX_VALIDATION_DELAY_MILLIS: i64 = 5_000;

const GUARD_COMPONENT: &str = "navigation_guard";

// ---------------------------------------------------------------------------
// GuardConfig
// ---------------------------------------------------------------------------

/// Host-supplied guard tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    pub validation_delay_millis: i64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            validation_delay_millis: DEFAULT_VALIDATION_DELAY_MILLIS,
        }
    }
}

impl GuardConfig {
    pub fn clamped(self) -> Self {
        let validation_delay_millis = self
            .validation_delay_millis
            .clamp(0, MAX_VALIDATION_DELAY_MILLIS);
        Self {
            validation_delay_millis,
        }
    }
}

// ---------------------------------------------------------------------------
// GuardState
// ---------------------------------------------------------------------------

/// Validation cycle states. The render gate is open only in `Allowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Idle,
    Validating,
    Allowed,
    Redirecting,
}

impl GuardState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Allowed => "allowed",
            Self::Redirecting => "redirecting",
        }
    }
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why a redirect target was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// The matcher found a heuristically similar table entry.
    SimilarMatch,
    /// No match, but the persisted last-known-good path is still served.
    PersistedFallback,
    /// No match and no usable persisted state; the configured default path.
    DefaultFallback,
}

impl RedirectReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SimilarMatch => "similar_match",
            Self::PersistedFallback => "persisted_fallback",
            Self::DefaultFallback => "default_fallback",
        }
    }
}

impl std::fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Outcome of one validation cycle. Produced fresh each cycle, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationDecision {
    /// Navigation proceeds; the render gate is open.
    Allow { path: String },
    /// The host must replace-navigate to `target` and re-enter the guard.
    Redirect {
        target: String,
        reason: RedirectReason,
    },
}

impl ValidationDecision {
    pub fn path(&self) -> &str {
        match self {
            Self::Allow { path } => path,
            Self::Redirect { target, .. } => target,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

// ---------------------------------------------------------------------------
// GuardEvent — structured log drained by the host
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardEventKind {
    NavigationRequested,
    ValidationCancelled,
    DecisionAllow,
    DecisionRedirect,
    StoreFault,
    ForceRecovery,
    Reset,
}

impl GuardEventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NavigationRequested => "navigation_requested",
            Self::ValidationCancelled => "validation_cancelled",
            Self::DecisionAllow => "decision_allow",
            Self::DecisionRedirect => "decision_redirect",
            Self::StoreFault => "store_fault",
            Self::ForceRecovery => "force_recovery",
            Self::Reset => "reset",
        }
    }
}

/// Structured guard event (stable keys for host telemetry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardEvent {
    pub timestamp_millis: i64,
    pub generation: u64,
    pub component: String,
    pub kind: GuardEventKind,
    pub path: String,
    pub outcome: String,
    pub error_code: Option<String>,
}

// ---------------------------------------------------------------------------
// NavigationGuard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingValidation {
    generation: u64,
    path: String,
    due_at_millis: i64,
}

/// Per-mount navigation guard instance.
#[derive(Debug)]
pub struct NavigationGuard<B> {
    pub(crate) table: RouteTable,
    pub(crate) store: NavStore<B>,
    pub(crate) config: GuardConfig,
    pub(crate) state: GuardState,
    pending: Option<PendingValidation>,
    pub(crate) generation: u64,
    pub(crate) events: Vec<GuardEvent>,
}

impl<B: KeyValueBackend> NavigationGuard<B> {
    pub fn new(table: RouteTable, store: NavStore<B>, config: GuardConfig) -> Self {
        Self {
            table,
            store,
            config: config.clamped(),
            state: GuardState::Idle,
            pending: None,
            generation: 0,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// True once the current path reached ALLOW. While closed, the host must
    /// render only its loading indicator, nothing of the wrapped subtree.
    pub fn render_gate_open(&self) -> bool {
        self.state == GuardState::Allowed
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.table
    }

    pub fn store(&self) -> &NavStore<B> {
        &self.store
    }

    pub fn config(&self) -> GuardConfig {
        self.config
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// When the pending validation becomes due, if one is scheduled.
    pub fn pending_due_at(&self) -> Option<i64> {
        self.pending.as_ref().map(|pending| pending.due_at_millis)
    }

    pub fn events(&self) -> &[GuardEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GuardEvent> {
        std::mem::take(&mut self.events)
    }

    /// A navigation event for `path`. Cancels any pending validation from a
    /// prior path — its decision can no longer apply — and schedules a new
    /// one at `now + delay`. Closes the render gate.
    pub fn on_navigation(&mut self, path: &str, now_millis: i64) {
        if let Some(stale) = self.pending.take() {
            self.record(
                now_millis,
                stale.generation,
                GuardEventKind::ValidationCancelled,
                &stale.path,
                "superseded",
                None,
            );
        }
        self.generation += 1;
        self.pending = Some(PendingValidation {
            generation: self.generation,
            path: path.to_string(),
            due_at_millis: now_millis.saturating_add(self.config.validation_delay_millis),
        });
        self.state = GuardState::Validating;
        self.record(
            now_millis,
            self.generation,
            GuardEventKind::NavigationRequested,
            path,
            "scheduled",
            None,
        );
    }

    /// Run the pending validation if it is due. Returns `None` while nothing
    /// is due; the host keeps polling from its task queue.
    pub fn poll(&mut self, now_millis: i64) -> Option<ValidationDecision> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now_millis >= pending.due_at_millis);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;
        // Superseded tasks never survive in the pending slot; the generation
        // check is the backstop against a replayed stale task.
        if pending.generation != self.generation {
            return None;
        }
        Some(self.decide(&pending.path, pending.generation, now_millis))
    }

    fn decide(
        &mut self,
        path: &str,
        generation: u64,
        now_millis: i64,
    ) -> ValidationDecision {
        match match_path(path, &self.table) {
            PathMatch::Exact(entry) => {
                if let Err(error) = self.store.write(&entry, now_millis) {
                    self.record(
                        now_millis,
                        generation,
                        GuardEventKind::StoreFault,
                        &entry,
                        "write_failed",
                        Some(error.error_code().to_string()),
                    );
                }
                self.state = GuardState::Allowed;
                self.record(
                    now_millis,
                    generation,
                    GuardEventKind::DecisionAllow,
                    &entry,
                    "pass",
                    None,
                );
                ValidationDecision::Allow { path: entry }
            }
            PathMatch::Similar(entry) => {
                self.redirect(entry, RedirectReason::SimilarMatch, generation, now_millis)
            }
            PathMatch::NoMatch => {
                let persisted = match self.store.read() {
                    Ok(persisted) => persisted,
                    Err(error) => {
                        self.record(
                            now_millis,
                            generation,
                            GuardEventKind::StoreFault,
                            path,
                            "read_failed",
                            Some(error.error_code().to_string()),
                        );
                        None
                    }
                };
                match persisted {
                    Some(state) if self.table.is_valid(&state.path) => self.redirect(
                        state.path,
                        RedirectReason::PersistedFallback,
                        generation,
                        now_millis,
                    ),
                    _ => self.redirect(
                        self.table.default_path().to_string(),
                        RedirectReason::DefaultFallback,
                        generation,
                        now_millis,
                    ),
                }
            }
        }
    }

    fn redirect(
        &mut self,
        target: String,
        reason: RedirectReason,
        generation: u64,
        now_millis: i64,
    ) -> ValidationDecision {
        self.state = GuardState::Redirecting;
        self.record(
            now_millis,
            generation,
            GuardEventKind::DecisionRedirect,
            &target,
            reason.as_str(),
            None,
        );
        ValidationDecision::Redirect { target, reason }
    }

    pub(crate) fn record(
        &mut self,
        timestamp_millis: i64,
        generation: u64,
        kind: GuardEventKind,
        path: &str,
        outcome: &str,
        error_code: Option<String>,
    ) {
        self.events.push(GuardEvent {
            timestamp_millis,
            generation,
            component: GUARD_COMPONENT.to_string(),
            kind,
            path: path.to_string(),
            outcome: outcome.to_string(),
            error_code,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav_store::{MemoryBackend, StoreError, StoreOperation};

    fn sample_table() -> RouteTable {
        RouteTable::new(["/", "/programs", "/programs/internship", "/products"])
            .expect("valid table")
    }

    fn guard() -> NavigationGuard<MemoryBackend> {
        NavigationGuard::new(
            sample_table(),
            NavStore::new(MemoryBackend::new()),
            GuardConfig::default(),
        )
    }

    /// Backend whose operations can be forced to fail, for §7 fault paths.
    #[derive(Debug, Default)]
    struct FaultBackend {
        inner: MemoryBackend,
        fail_gets: bool,
        fail_sets: bool,
    }

    impl KeyValueBackend for FaultBackend {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_gets {
                return Err(StoreError::unavailable(
                    StoreOperation::Get,
                    key,
                    "storage disabled",
                ));
            }
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_sets {
                return Err(StoreError::unavailable(
                    StoreOperation::Set,
                    key,
                    "storage disabled",
                ));
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    // -- Config --

    #[test]
    fn default_config_uses_standard_delay() {
        assert_eq!(
            GuardConfig::default().validation_delay_millis,
            DEFAULT_VALIDATION_DELAY_MILLIS
        );
    }

    #[test]
    fn config_clamps_out_of_range_delays() {
        let config = GuardConfig {
            validation_delay_millis: -5,
        };
        assert_eq!(config.clamped().validation_delay_millis, 0);

        let config = GuardConfig {
            validation_delay_millis: 60_000,
        };
        assert_eq!(
            config.clamped().validation_delay_millis,
            MAX_VALIDATION_DELAY_MILLIS
        );
    }

    // -- Initial state --

    #[test]
    fn fresh_guard_is_idle_with_closed_gate() {
        let guard = guard();
        assert_eq!(guard.state(), GuardState::Idle);
        assert!(!guard.render_gate_open());
        assert_eq!(guard.pending_due_at(), None);
        assert_eq!(guard.current_generation(), 0);
    }

    // -- Scheduling and debounce --

    #[test]
    fn navigation_enters_validating_and_schedules() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        assert_eq!(guard.state(), GuardState::Validating);
        assert!(!guard.render_gate_open());
        assert_eq!(guard.pending_due_at(), Some(1_100));
    }

    #[test]
    fn poll_before_delay_elapses_is_a_no_op() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        assert_eq!(guard.poll(1_050), None);
        assert_eq!(guard.state(), GuardState::Validating);
        // Still pending; the task was not consumed.
        assert_eq!(guard.pending_due_at(), Some(1_100));
    }

    #[test]
    fn poll_without_pending_is_a_no_op() {
        let mut guard = guard();
        assert_eq!(guard.poll(10_000), None);
    }

    // -- ALLOW --

    #[test]
    fn exact_match_allows_and_persists() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        let decision = guard.poll(1_100).expect("due");
        assert_eq!(
            decision,
            ValidationDecision::Allow {
                path: "/products".to_string()
            }
        );
        assert_eq!(guard.state(), GuardState::Allowed);
        assert!(guard.render_gate_open());

        let persisted = guard.store().read().expect("read").expect("present");
        assert_eq!(persisted.path, "/products");
        assert_eq!(persisted.timestamp_millis, Some(1_100));
    }

    #[test]
    fn trailing_slash_input_persists_normalized_entry() {
        let mut guard = guard();
        guard.on_navigation("/programs/internship/", 1_000);
        let decision = guard.poll(1_200).expect("due");
        assert_eq!(decision.path(), "/programs/internship");
        assert!(decision.is_allow());
        let persisted = guard.store().read().expect("read").expect("present");
        assert_eq!(persisted.path, "/programs/internship");
    }

    // -- REDIRECT-TO-SIMILAR --

    #[test]
    fn similar_match_redirects_without_persisting() {
        let mut guard = guard();
        guard.on_navigation("/programs/unknown-id", 1_000);
        let decision = guard.poll(1_100).expect("due");
        assert_eq!(
            decision,
            ValidationDecision::Redirect {
                target: "/programs".to_string(),
                reason: RedirectReason::SimilarMatch,
            }
        );
        assert_eq!(guard.state(), GuardState::Redirecting);
        assert!(!guard.render_gate_open());
        // Only ALLOW writes the store.
        assert_eq!(guard.store().read().expect("read"), None);
    }

    // -- REDIRECT-TO-PERSISTED / REDIRECT-TO-DEFAULT --

    #[test]
    fn no_match_with_empty_store_falls_to_default() {
        let mut guard = guard();
        guard.on_navigation("/xyz123", 1_000);
        let decision = guard.poll(1_100).expect("due");
        assert_eq!(
            decision,
            ValidationDecision::Redirect {
                target: "/".to_string(),
                reason: RedirectReason::DefaultFallback,
            }
        );
    }

    #[test]
    fn no_match_with_valid_persisted_path_falls_to_it() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        guard.poll(1_100).expect("allow");

        guard.on_navigation("/xyz123", 2_000);
        let decision = guard.poll(2_100).expect("due");
        assert_eq!(
            decision,
            ValidationDecision::Redirect {
                target: "/products".to_string(),
                reason: RedirectReason::PersistedFallback,
            }
        );
    }

    #[test]
    fn no_match_with_stale_persisted_path_falls_to_default() {
        // Persisted path no longer in the table: fall to default, not to it.
        let mut backend = MemoryBackend::new();
        backend
            .set(crate::nav_store::KEY_CURRENT_ROUTE, "/retired")
            .expect("set");
        let mut guard = NavigationGuard::new(
            sample_table(),
            NavStore::new(backend),
            GuardConfig::default(),
        );
        guard.on_navigation("/xyz123", 1_000);
        let decision = guard.poll(1_100).expect("due");
        assert_eq!(
            decision,
            ValidationDecision::Redirect {
                target: "/".to_string(),
                reason: RedirectReason::DefaultFallback,
            }
        );
    }

    // -- Cancellation --

    #[test]
    fn new_navigation_cancels_pending_validation() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        guard.on_navigation("/programs", 1_050);
        // Only the second task remains; its due time reflects the second
        // navigation.
        assert_eq!(guard.pending_due_at(), Some(1_150));

        let decision = guard.poll(1_150).expect("due");
        assert_eq!(decision.path(), "/programs");
        assert_eq!(guard.current_generation(), 2);
    }

    #[test]
    fn stale_decision_never_applies_after_supersede() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        // Supersede before the first task fires.
        guard.on_navigation("/xyz123", 1_050);
        let decision = guard.poll(1_150).expect("due");
        // The decision reflects `/xyz123`, not `/products`.
        assert_eq!(
            decision,
            ValidationDecision::Redirect {
                target: "/".to_string(),
                reason: RedirectReason::DefaultFallback,
            }
        );
        // `/products` was never allowed, so nothing was persisted.
        assert_eq!(guard.store().read().expect("read"), None);
    }

    #[test]
    fn cancellation_emits_event_for_stale_generation() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        guard.on_navigation("/programs", 1_050);
        let events = guard.drain_events();
        let cancelled: Vec<_> = events
            .iter()
            .filter(|event| event.kind == GuardEventKind::ValidationCancelled)
            .collect();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].path, "/products");
        assert_eq!(cancelled[0].generation, 1);
        assert_eq!(cancelled[0].outcome, "superseded");
    }

    // -- Store fault tolerance --

    #[test]
    fn write_failure_still_opens_render_gate() {
        let backend = FaultBackend {
            fail_sets: true,
            ..FaultBackend::default()
        };
        let mut guard = NavigationGuard::new(
            sample_table(),
            NavStore::new(backend),
            GuardConfig::default(),
        );
        guard.on_navigation("/products", 1_000);
        let decision = guard.poll(1_100).expect("due");
        assert!(decision.is_allow());
        assert!(guard.render_gate_open());

        let events = guard.drain_events();
        assert!(events
            .iter()
            .any(|event| event.kind == GuardEventKind::StoreFault
                && event.outcome == "write_failed"));
    }

    #[test]
    fn read_failure_falls_through_to_default() {
        let backend = FaultBackend {
            fail_gets: true,
            ..FaultBackend::default()
        };
        let mut guard = NavigationGuard::new(
            sample_table(),
            NavStore::new(backend),
            GuardConfig::default(),
        );
        guard.on_navigation("/xyz123", 1_000);
        let decision = guard.poll(1_100).expect("due");
        assert_eq!(
            decision,
            ValidationDecision::Redirect {
                target: "/".to_string(),
                reason: RedirectReason::DefaultFallback,
            }
        );
        let events = guard.drain_events();
        assert!(events
            .iter()
            .any(|event| event.kind == GuardEventKind::StoreFault
                && event.outcome == "read_failed"));
    }

    // -- Events --

    #[test]
    fn allow_cycle_event_sequence() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        guard.poll(1_100).expect("due");
        let events = guard.drain_events();
        let kinds: Vec<GuardEventKind> = events.iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            [
                GuardEventKind::NavigationRequested,
                GuardEventKind::DecisionAllow
            ]
        );
        assert!(events.iter().all(|event| event.component == "navigation_guard"));
    }

    #[test]
    fn drain_events_clears_log() {
        let mut guard = guard();
        guard.on_navigation("/products", 1_000);
        assert_eq!(guard.drain_events().len(), 1);
        assert!(guard.events().is_empty());
    }

    // -- Zero-delay config --

    #[test]
    fn zero_delay_validates_on_same_instant() {
        let mut guard = NavigationGuard::new(
            sample_table(),
            NavStore::new(MemoryBackend::new()),
            GuardConfig {
                validation_delay_millis: 0,
            },
        );
        guard.on_navigation("/products", 1_000);
        assert!(guard.poll(1_000).expect("due").is_allow());
    }

    // -- Display / serde --

    #[test]
    fn guard_state_display() {
        assert_eq!(GuardState::Idle.to_string(), "idle");
        assert_eq!(GuardState::Validating.to_string(), "validating");
        assert_eq!(GuardState::Allowed.to_string(), "allowed");
        assert_eq!(GuardState::Redirecting.to_string(), "redirecting");
    }

    #[test]
    fn redirect_reason_display() {
        assert_eq!(RedirectReason::SimilarMatch.to_string(), "similar_match");
        assert_eq!(
            RedirectReason::PersistedFallback.to_string(),
            "persisted_fallback"
        );
        assert_eq!(
            RedirectReason::DefaultFallback.to_string(),
            "default_fallback"
        );
    }

    #[test]
    fn decision_serde_round_trip() {
        let decisions = [
            ValidationDecision::Allow {
                path: "/products".to_string(),
            },
            ValidationDecision::Redirect {
                target: "/".to_string(),
                reason: RedirectReason::DefaultFallback,
            },
        ];
        for decision in &decisions {
            let json = serde_json::to_string(decision).expect("serialize");
            let restored: ValidationDecision =
                serde_json::from_str(&json).expect("deserialize");
            assert_eq!(*decision, restored);
        }
    }

    #[test]
    fn guard_event_serde_round_trip() {
        let event = GuardEvent {
            timestamp_millis: 1_100,
            generation: 1,
            component: "navigation_guard".to_string(),
            kind: GuardEventKind::DecisionAllow,
            path: "/products".to_string(),
            outcome: "pass".to_string(),
            error_code: None,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let restored: GuardEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(event, restored);
    }
}
