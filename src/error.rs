//! Error types and parse diagnostics.
//!
//! Content problems never abort parsing or rendering: they are reported as
//! [`Diagnostic`]s alongside a best-effort result. Only API misuse (the
//! registry) and I/O (fixtures, configuration) surface as `Err`.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Span;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The tree was repaired; all source content is still present.
    Warning,
    /// Source data was discarded.
    Error,
}

/// A recoverable anomaly found while tokenizing or building the block tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIssue {
    #[error("invalid JSON attributes on block \"{name}\": {reason}")]
    MalformedAttributes { name: String, reason: String },

    #[error("closing delimiter for \"{found}\" closed open block \"{expected}\"")]
    MismatchedCloser { expected: String, found: String },

    #[error("closing delimiter for \"{name}\" has no open block")]
    StrayCloser { name: String },

    #[error("block \"{name}\" was never closed")]
    UnclosedBlock { name: String },
}

impl ParseIssue {
    /// Malformed attributes are discarded, so they rank as errors. Structural
    /// repairs keep every byte of the source and rank as warnings.
    pub fn severity(&self) -> Severity {
        match self {
            ParseIssue::MalformedAttributes { .. } => Severity::Error,
            ParseIssue::MismatchedCloser { .. }
            | ParseIssue::StrayCloser { .. }
            | ParseIssue::UnclosedBlock { .. } => Severity::Warning,
        }
    }
}

/// A parse issue with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub issue: ParseIssue,
    pub span: Span,
}

impl Diagnostic {
    /// A diagnostic whose severity follows from its issue.
    pub fn new(issue: ParseIssue, span: Span) -> Self {
        Self {
            severity: issue.severity(),
            issue,
            span,
        }
    }

    /// Human-readable description of the issue.
    pub fn message(&self) -> String {
        self.issue.to_string()
    }
}

/// Misuse of the block type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid block type name \"{name}\": {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("block type \"{0}\" is already registered")]
    AlreadyRegistered(String),

    #[error("block type \"{0}\" is not registered")]
    NotRegistered(String),

    #[error("invalid block metadata: {0}")]
    InvalidMetadata(String),
}

/// Failure to locate or read a fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("missing fixture file: '{}'", .0.display())]
    Missing(PathBuf),

    #[error("failed to read fixture '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to load [`RenderOptions`](crate::config::RenderOptions).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid render options: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
