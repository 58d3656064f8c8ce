//! Error taxonomy for the confidence pipeline.

use serde::{Deserialize, Serialize};

/// Malformed trigger input. Fatal: aborts the workflow immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("field {field} must not be empty")]
    EmptyField { field: String },

    #[error("file change #{index} has an empty path")]
    EmptyFilePath { index: usize },

    #[error("malformed trigger payload: {0}")]
    Malformed(String),
}

/// Marker for a collaborator fetch that could not be (fully) satisfied.
///
/// Fetch errors travel *inside* `RequirementSet` / `DocumentationSet`; sources
/// never return them as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("{source_name} timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("{source_name} skipped {reference}: {reason}")]
    Partial {
        source_name: String,
        reference: String,
        reason: String,
    },
}

/// Failure of a single scorer call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("scorer timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("scorer backend error: {0}")]
    Backend(String),

    #[error("scorer returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("scorer call cancelled")]
    Cancelled,
}

/// Report-store failure. Logged only; never affects the returned report.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("report store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("report digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("report store backend error: {0}")]
    Backend(String),
}

/// Invalid pipeline configuration, rejected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{set} weights sum to {sum}, expected 1.0")]
    WeightSum { set: &'static str, sum: f64 },

    #[error("{set} weight {name} is negative or not finite: {value}")]
    InvalidWeight {
        set: &'static str,
        name: &'static str,
        value: f64,
    },

    #[error("invalid band table {table}: {reason}")]
    InvalidBands { table: &'static str, reason: String },

    #[error("invalid penalty policy: {0}")]
    InvalidPenalty(String),

    #[error("invalid runtime setting: {0}")]
    InvalidRuntime(String),

    #[error("invalid glob {pattern}: {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine-level error umbrella.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("workflow budget of {budget_ms}ms exceeded")]
    Timeout { budget_ms: u64 },

    #[error("workflow cancelled")]
    Cancelled,

    #[error("invalid node transition for {node}: {from} -> {to}")]
    InvalidTransition {
        node: String,
        from: String,
        to: String,
    },

    #[error("workflow graph cycle involving nodes: {nodes:?}")]
    DependencyCycle { nodes: Vec<String> },

    #[error("unknown dependency {dependency} declared by {node}")]
    UnknownDependency { node: String, dependency: String },

    #[error("node {node} missing upstream output: {detail}")]
    MissingInput { node: String, detail: String },
}

impl PipelineError {
    /// Classification used for `WorkflowState` error-log entries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Scoring(_) => ErrorKind::Scoring,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config(_)
            | Self::InvalidTransition { .. }
            | Self::DependencyCycle { .. }
            | Self::UnknownDependency { .. }
            | Self::MissingInput { .. } => ErrorKind::Internal,
        }
    }

    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Timeout { .. } | FetchError::Unavailable { .. }) => true,
            Self::Scoring(
                ScoringError::Timeout { .. }
                | ScoringError::Backend(_)
                | ScoringError::MalformedResponse(_),
            ) => true,
            _ => false,
        }
    }
}

/// Closed classification of error-log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Fetch,
    Scoring,
    Persistence,
    Timeout,
    Cancelled,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Fetch => "fetch",
            Self::Scoring => "scoring",
            Self::Persistence => "persistence",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
