//! Error taxonomy for every fallible surface in the crate.
//!
//! One dedicated enum per subsystem, derived with `thiserror` rather than a
//! hand-rolled `Display` impl.

use std::fmt;

/// Stable error codes surfaced to callers of [`crate::scan::scan`].
///
/// Per-entry access failures never reach this type; they are tallied into
/// [`crate::scan::ScanStats::access_errors`] instead (see
/// [`crate::error::ScanError`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanErrorCode {
    NotFound,
    NotDirectory,
    RootStatFailed,
    Cancelled,
    Internal,
}

impl fmt::Display for ScanErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::NotDirectory => "not_directory",
            Self::RootStatFailed => "root_stat_failed",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A fatal scan error: root does not exist, cannot be stat'd, is not a
/// directory, or the scan was cancelled before completion.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{code}: {message} ({path})")]
pub struct ScanError {
    pub code: ScanErrorCode,
    pub path: String,
    pub message: String,
}

impl ScanError {
    #[must_use]
    pub fn new(code: ScanErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors from the build-phase/query-phase contract of [`crate::pattern::Automaton`].
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum MatcherError {
    #[error("cannot add_word after make_automaton: automaton already built")]
    AlreadyBuilt,
    #[error("automaton already built")]
    BuiltTwice,
    #[error("iter() called before make_automaton: automaton not built")]
    NotBuilt,
}

/// Errors from loading or saving an [`crate::config::AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed reading config at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing config at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config at {path} must be a JSON object")]
    InvalidDocument { path: String },
}
