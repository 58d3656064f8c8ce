//! PR Confidence Core Library
//!
//! Evaluates a pull request against its linked requirements and
//! documentation and produces a reproducible confidence report. The
//! pipeline runs as a DAG of nodes inside [`WorkflowEngine`]; every external
//! dependency sits behind a trait in [`collab`].

pub mod analyzer;
pub mod collab;
pub mod confidence;
pub mod config;
pub mod context;
pub mod cross_reference;
pub mod domain;
pub mod fakes;
pub mod gaps;
pub mod lexical;
pub mod obs;
pub mod recommendations;
pub mod rendering;
pub mod report_builder;
pub mod store;
pub mod telemetry;
pub mod workflow;

pub use domain::{
    ActionItem, AlignmentDimension, AlignmentResult, ChangeMetrics, ChangeStatus, Component,
    ConfidenceLevel, ConfidenceReport, ConfigError, ConsistencyDimension, ConsistencyResult,
    CrossReferenceResult, DocRef, DocumentationSet, Effort, ErrorKind, FetchError, FileChange,
    Gap, GapType, ImpactScope, PersistenceError, PipelineError, PrContext, Priority,
    QualitySignals, Recommendation, ReportSummary, Requirement, RequirementSet, Result,
    ScoringError, Severity, SignalFinding, SignalStrength, TriggerEvent, ValidationError,
    REPORT_SCHEMA_VERSION,
};

pub use collab::{
    AnalysisKind, DimensionPrompt, DocumentationSource, LogNotifier, Notifier, ProgressSink,
    ReportStore, RequirementSource, Scorer, SignalProvider, StaticDocumentationSource,
    StaticRequirementSource, StaticSignalProvider,
};
pub use config::{PenaltyMode, PipelineConfig};
pub use confidence::{score_confidence, ConfidenceScore};
pub use lexical::LexicalScorer;
pub use rendering::{render_markdown, write_report_json};
pub use store::FsReportStore;
pub use workflow::{
    EngineBuilder, NodeId, NodeStatus, OverallStatus, Trigger, WorkflowEngine, WorkflowOutcome,
    WorkflowState,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
