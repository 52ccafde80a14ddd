//! Error Types
//!
//! Every fallible operation in the crate returns [`GraphError`]. Nothing is
//! retried: the first error aborts graph construction and no job is handed
//! to an engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or registering a job graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A pattern suffix rule did not match exactly once at the end of a path.
    #[error("suffix pattern '{pattern}' matched {matches} times at the end of '{path}' (expected exactly 1)")]
    PathRule {
        path: String,
        pattern: String,
        matches: usize,
    },

    #[error("invalid suffix pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Filesystem failures are surfaced as-is.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("gene allowlist '{}': {message}", .path.display())]
    Allowlist { path: PathBuf, message: String },

    #[error("failed to read gene table: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid candidate pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("failed to list candidate file: {0}")]
    GlobEntry(#[from] glob::GlobError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("duplicate job name '{0}'")]
    DuplicateJob(String),

    #[error("tree file '{tree}' for gene '{gene}' does not exist")]
    MissingTreeFile { gene: String, tree: String },

    #[error("invalid job graph:\n{0}")]
    InvalidGraph(String),

    #[error("failed to serialize job graph: {0}")]
    Serialize(String),
}

impl From<serde_yaml::Error> for GraphError {
    fn from(e: serde_yaml::Error) -> Self {
        GraphError::Serialize(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Serialize(e.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GraphError>;
