pub mod analysis;
pub mod digest;
pub mod error;
pub mod gap;
pub mod pr;
pub mod report;
pub mod sources;

pub use analysis::{
    AlignmentDimension, AlignmentResult, ConsistencyDimension, ConsistencyResult,
    CrossReferenceResult, Dimension, DimensionScores, ScoreSource, NEUTRAL_SCORE,
};
pub use error::{
    ConfigError, ErrorKind, FetchError, PersistenceError, PipelineError, Result, ScoringError,
    ValidationError,
};
pub use gap::{is_blocking, severity_for, sort_gaps, Gap, GapType, Severity, SignalStrength};
pub use pr::{
    ChangeMetrics, ChangeStatus, FileChange, ImpactScope, PrContext, TriggerEvent,
};
pub use report::{
    ActionItem, Component, ConfidenceLevel, ConfidenceReport, Effort, Priority, Recommendation,
    ReportSummary, REPORT_SCHEMA_VERSION,
};
pub use sources::{
    DocRef, DocumentationSet, QualitySignals, Requirement, RequirementPriority, RequirementSet,
    SignalFinding,
};
