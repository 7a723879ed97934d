#![forbid(unsafe_code)]

//! Navigation validation and recovery controller.
//!
//! A guard that runs on every in-app navigation, checks whether the
//! requested path is one the application actually serves, and, if not,
//! deterministically recovers to the closest known-good path: a tiered
//! matcher (exact, first-segment, substring) backed by a durable
//! last-known-good store, with a manual recovery surface for operator
//! tooling.
//!
//! The guard is a host-driven state machine: the host forwards navigation
//! events with explicit timestamps, polls for the decision, performs any
//! returned replace-navigation, and keeps the wrapped subtree unrendered
//! until the render gate opens.

pub mod clock;
pub mod diagnostics;
pub mod nav_store;
pub mod path_match;
pub mod recovery;
pub mod route_table;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diagnostics::DiagnosticsSnapshot;
pub use nav_store::{
    KeyValueBackend, MemoryBackend, NavStore, PersistedNavState, StoreError, StoreOperation,
    KEY_CURRENT_ROUTE, KEY_ROUTE_HASH, KEY_TIMESTAMP,
};
pub use path_match::{first_segment, match_path, normalize_path, PathMatch};
pub use route_table::{RouteTable, RouteTableError, DEFAULT_PATH};
pub use validator::{
    GuardConfig, GuardEvent, GuardEventKind, GuardState, NavigationGuard, RedirectReason,
    ValidationDecision, DEFAULT_VALIDATION_DELAY_MILLIS, MAX_VALIDATION_DELAY_MILLIS,
};
