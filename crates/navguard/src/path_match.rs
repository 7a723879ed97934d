//! Tiered path matching against the route table.
//!
//! The matcher is deliberately coarse: first-match-wins, not best-match, and
//! order-dependent on the table. It is a client-side guard heuristic, not a
//! general router, so there is no wildcard or parameter syntax at this layer.

use serde::{Deserialize, Serialize};

use crate::route_table::RouteTable;

/// Outcome of matching a requested path against the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatch {
    /// Requested path equals a table entry verbatim, modulo trailing slash.
    Exact(String),
    /// A table entry selected by the first-segment or substring heuristic.
    Similar(String),
    NoMatch,
}

impl PathMatch {
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Exact(path) | Self::Similar(path) => Some(path),
            Self::NoMatch => None,
        }
    }
}

/// Strip a single trailing `/`, preserving the bare root path.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

/// First non-empty `/`-delimited segment, if any.
pub fn first_segment(path: &str) -> Option<&str> {
    path.split('/').find(|segment| !segment.is_empty())
}

/// Match `requested` against `table`. Tiers run in order; first success wins.
///
/// 1. exact entry, trailing slash stripped;
/// 2. first entry whose first segment equals the requested first segment
///    (deeper segments are ignored);
/// 3. first entry containing the requested first segment as a substring;
/// 4. [`PathMatch::NoMatch`].
///
/// A requested path with no non-empty segments skips tiers 2 and 3.
pub fn match_path(requested: &str, table: &RouteTable) -> PathMatch {
    let normalized = normalize_path(requested);

    for entry in table.entries() {
        if entry == normalized {
            return PathMatch::Exact(entry.clone());
        }
    }

    let Some(seg0) = first_segment(normalized) else {
        return PathMatch::NoMatch;
    };

    for entry in table.entries() {
        if first_segment(entry) == Some(seg0) {
            return PathMatch::Similar(entry.clone());
        }
    }

    for entry in table.entries() {
        if entry.contains(seg0) {
            return PathMatch::Similar(entry.clone());
        }
    }

    PathMatch::NoMatch
}
