//! Contracts for the external collaborators the pipeline consumes.
//!
//! Production wires real tracker, wiki and model clients behind these
//! traits; tests use [`crate::fakes`]. The static implementations here serve
//! preloaded data, which is what the CLI uses for file-based runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::error::{FetchError, PersistenceError, ScoringError};
use crate::domain::pr::PrContext;
use crate::domain::report::{ConfidenceReport, ReportSummary};
use crate::domain::sources::{DocumentationSet, QualitySignals, RequirementSet};
use crate::workflow::{NodeId, NodeStatus};

/// Which analysis a scorer call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Alignment,
    Consistency,
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alignment => write!(f, "alignment"),
            Self::Consistency => write!(f, "consistency"),
        }
    }
}

/// One piece of evidence the scorer should weigh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Ticket id or doc id.
    pub reference: String,
    pub text: String,
}

/// A scoring request covering one full dimension set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionPrompt {
    pub kind: AnalysisKind,
    /// Wire names of the dimensions to score, in declaration order.
    pub dimensions: Vec<String>,
    pub instructions: String,
    pub evidence: Vec<Evidence>,
}

/// Retrieves the requirements linked to a change.
///
/// Remote failures are reported through `RequirementSet::fetch_errors`, never
/// as a panic or an error return. The engine bounds each call with a timeout.
#[async_trait]
pub trait RequirementSource: Send + Sync {
    async fn fetch(&self, ctx: &PrContext) -> RequirementSet;
}

/// Retrieves the documentation relevant to a change. Same contract as
/// [`RequirementSource`].
#[async_trait]
pub trait DocumentationSource: Send + Sync {
    async fn fetch(&self, ctx: &PrContext) -> DocumentationSet;
}

/// Scores a dimension set. Values outside `[0, 1]` are clamped by the caller
/// and omitted dimensions are imputed.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(
        &self,
        prompt: &DimensionPrompt,
        ctx: &PrContext,
    ) -> Result<BTreeMap<String, f64>, ScoringError>;
}

/// Supplies heuristic quality signals (coverage, lint, security scanners).
#[async_trait]
pub trait SignalProvider: Send + Sync {
    async fn collect(&self, ctx: &PrContext) -> Result<QualitySignals, FetchError>;
}

/// Best-effort delivery of a report summary. Failures are logged only.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, summary: &ReportSummary) -> anyhow::Result<()>;
}

/// Durable report storage. Returns the stored report id.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn persist(&self, report: &ConfidenceReport) -> Result<String, PersistenceError>;

    async fn load(&self, report_id: &str) -> Result<ConfidenceReport, PersistenceError>;
}

/// Append-only feed of node results for one run.
///
/// Invoked after each node group settles and before the next one starts, in
/// graph order. A cancellation requested from here is observed before the
/// next group.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn node_finished(&self, run_id: &str, node: NodeId, status: NodeStatus);
}

// ---------------------------------------------------------------------------
// Static collaborators
// ---------------------------------------------------------------------------

/// Serves a preloaded requirement set, keeping only the tickets the change
/// links to when it links any.
#[derive(Debug, Clone, Default)]
pub struct StaticRequirementSource {
    set: RequirementSet,
}

impl StaticRequirementSource {
    pub fn new(set: RequirementSet) -> Self {
        Self { set }
    }
}

#[async_trait]
impl RequirementSource for StaticRequirementSource {
    async fn fetch(&self, ctx: &PrContext) -> RequirementSet {
        let refs = ctx.linked_requirement_refs();
        if refs.is_empty() {
            return self.set.clone();
        }
        let requirements = self
            .set
            .requirements
            .iter()
            .filter(|r| refs.iter().any(|id| id.eq_ignore_ascii_case(&r.ticket_id)))
            .cloned()
            .collect();
        let mut fetch_errors = self.set.fetch_errors.clone();
        for id in refs {
            let known = self
                .set
                .requirements
                .iter()
                .any(|r| id.eq_ignore_ascii_case(&r.ticket_id));
            if !known {
                fetch_errors.push(FetchError::Partial {
                    source_name: "requirements".to_string(),
                    reference: id.clone(),
                    reason: "ticket not found".to_string(),
                });
            }
        }
        RequirementSet {
            requirements,
            fetch_errors,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticDocumentationSource {
    set: DocumentationSet,
}

impl StaticDocumentationSource {
    pub fn new(set: DocumentationSet) -> Self {
        Self { set }
    }
}

#[async_trait]
impl DocumentationSource for StaticDocumentationSource {
    async fn fetch(&self, _ctx: &PrContext) -> DocumentationSet {
        self.set.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSignalProvider {
    signals: QualitySignals,
}

impl StaticSignalProvider {
    pub fn new(signals: QualitySignals) -> Self {
        Self { signals }
    }
}

#[async_trait]
impl SignalProvider for StaticSignalProvider {
    async fn collect(&self, _ctx: &PrContext) -> Result<QualitySignals, FetchError> {
        Ok(self.signals.clone())
    }
}

/// Notifier that writes the summary to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, summary: &ReportSummary) -> anyhow::Result<()> {
        info!(
            event = "report.published",
            repository = %summary.repository,
            pr_id = %summary.pr_id,
            score = summary.score,
            recommendation = %summary.recommendation,
            blocking_gaps = summary.blocking_gap_count,
            degraded = summary.degraded,
        );
        Ok(())
    }
}
