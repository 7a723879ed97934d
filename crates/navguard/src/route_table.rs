//! Fixed table of paths the application is willing to serve.
//!
//! The table is constructed once from host configuration and is immutable
//! afterwards. The validator and the diagnostics boundary are both handed the
//! same instance, so there is exactly one copy of the valid-route list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path_match::normalize_path;

/// Fallback path used when no better recovery target exists.
pub const DEFAULT_PATH: &str = "/";

/// Construction-time validation errors for [`RouteTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTableError {
    #[error("route table error [NG-TABLE-0001]: table has no entries")]
    EmptyTable,
    #[error("route table error [NG-TABLE-0002]: entry is empty")]
    EmptyEntry,
    #[error("route table error [NG-TABLE-0003]: entry `{path}` does not begin with '/'")]
    MissingLeadingSlash { path: String },
    #[error("route table error [NG-TABLE-0004]: duplicate entry `{path}`")]
    DuplicateEntry { path: String },
    #[error("route table error [NG-TABLE-0005]: default path `{path}` is not a table entry")]
    DefaultNotServed { path: String },
}

impl RouteTableError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyTable => "NG-TABLE-0001",
            Self::EmptyEntry => "NG-TABLE-0002",
            Self::MissingLeadingSlash { .. } => "NG-TABLE-0003",
            Self::DuplicateEntry { .. } => "NG-TABLE-0004",
            Self::DefaultNotServed { .. } => "NG-TABLE-0005",
        }
    }
}

/// Ordered, immutable set of served paths plus the configured default path.
///
/// Order is significant: the similar-match tiers of the path matcher scan the
/// table in definition order and take the first hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    entries: Vec<String>,
    default_path: String,
}

impl RouteTable {
    /// Build a table with `/` as the default path.
    pub fn new<I, S>(entries: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_default_path(entries, DEFAULT_PATH)
    }

    /// Build a table with an explicit default path.
    ///
    /// The default path must itself be a table entry; a default outside the
    /// table would make the default-fallback redirect loop forever.
    pub fn with_default_path<I, S>(
        entries: I,
        default_path: impl Into<String>,
    ) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.into();
            if entry.is_empty() {
                return Err(RouteTableError::EmptyEntry);
            }
            if !entry.starts_with('/') {
                return Err(RouteTableError::MissingLeadingSlash { path: entry });
            }
            let entry = normalize_path(&entry).to_string();
            if normalized.contains(&entry) {
                return Err(RouteTableError::DuplicateEntry { path: entry });
            }
            normalized.push(entry);
        }
        if normalized.is_empty() {
            return Err(RouteTableError::EmptyTable);
        }
        let default_path = normalize_path(&default_path.into()).to_string();
        if !normalized.contains(&default_path) {
            return Err(RouteTableError::DefaultNotServed { path: default_path });
        }
        Ok(Self {
            entries: normalized,
            default_path,
        })
    }

    /// Membership test modulo a single trailing slash.
    ///
    /// This is the test the diagnostic panel consumes to report whether the
    /// persisted path is still served.
    pub fn is_valid(&self, path: &str) -> bool {
        let normalized = normalize_path(path);
        self.entries.iter().any(|entry| entry == normalized)
    }

    /// Entries in definition order, trailing-slash normalized.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
