//! DAG executor for the confidence pipeline.
//!
//! One [`WorkflowEngine`] holds read-only collaborators and configuration and
//! can drive any number of concurrent runs. Everything mutable lives in the
//! per-run [`RunContext`], [`WorkflowState`] and artifact slots.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::analyzer::{analyze_alignment, analyze_consistency, ScoringClient};
use crate::collab::{
    DocumentationSource, Notifier, ProgressSink, ReportStore, RequirementSource, Scorer,
    SignalProvider, StaticDocumentationSource, StaticRequirementSource,
};
use crate::config::{PathMatcher, PipelineConfig};
use crate::confidence::{score_confidence, ConfidenceScore};
use crate::context::{extract_context, extract_from_value};
use crate::cross_reference::{cross_reference, percentages_only};
use crate::domain::analysis::{
    AlignmentResult, ConsistencyResult, CrossReferenceResult, ScoreSource,
};
use crate::domain::error::{ErrorKind, FetchError, PipelineError, Result};
use crate::domain::gap::Gap;
use crate::domain::pr::{PrContext, TriggerEvent};
use crate::domain::report::{ActionItem, ConfidenceReport};
use crate::domain::sources::{DocumentationSet, QualitySignals, RequirementSet};
use crate::gaps::{detect_gaps, evidence_gaps, GapInputs};
use crate::lexical::LexicalScorer;
use crate::obs;
use crate::recommendations::generate_recommendations;
use crate::report_builder::{build_report, ReportInputs};
use crate::workflow::graph::{NodeId, WorkflowGraph};
use crate::workflow::retry::{retry_transient, RetryPolicy};
use crate::workflow::run_context::RunContext;
use crate::workflow::state::{NodeStatus, OverallStatus, WorkflowState};

// ---------------------------------------------------------------------------
// Trigger and outcome
// ---------------------------------------------------------------------------

/// What starts a run: a parsed event or a raw JSON payload that is validated
/// by the context-extraction node.
#[derive(Debug, Clone)]
pub enum Trigger {
    Event(TriggerEvent),
    Payload(serde_json::Value),
}

impl Trigger {
    fn field(&self, key: &str) -> String {
        match self {
            Self::Event(e) => match key {
                "repository" => e.repository.clone(),
                _ => e.pr_id.clone(),
            },
            Self::Payload(v) => v
                .get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn repository(&self) -> String {
        self.field("repository")
    }

    pub fn pr_id(&self) -> String {
        self.field("prId")
    }
}

impl From<TriggerEvent> for Trigger {
    fn from(event: TriggerEvent) -> Self {
        Self::Event(event)
    }
}

impl From<serde_json::Value> for Trigger {
    fn from(payload: serde_json::Value) -> Self {
        Self::Payload(payload)
    }
}

/// Result of one run.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub state: WorkflowState,
    /// Present for `Completed` runs and salvaged `PartiallyCompleted` runs.
    pub report: Option<ConfidenceReport>,
    /// Identifier assigned by the report store, if one is configured and
    /// persisting succeeded.
    pub report_id: Option<String>,
    /// The error that ended the run early, if any.
    pub error: Option<PipelineError>,
}

impl WorkflowOutcome {
    pub fn status(&self) -> OverallStatus {
        self.state.status()
    }

    /// The report, or the error that prevented one.
    pub fn into_report(self) -> Result<ConfidenceReport> {
        match (self.report, self.error) {
            (Some(report), _) => Ok(report),
            (None, Some(err)) => Err(err),
            (None, None) => Err(PipelineError::MissingInput {
                node: NodeId::BuildReport.to_string(),
                detail: "run finished without a report".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum NodeOutput {
    Context(PrContext),
    Requirements(RequirementSet),
    Documentation(DocumentationSet),
    Alignment(AlignmentResult),
    Consistency(ConsistencyResult),
    Cross(CrossReferenceResult),
    Signals(Option<QualitySignals>),
    Gaps(Vec<Gap>),
    Score(ConfidenceScore),
    Recommendations(Vec<ActionItem>),
    Report(ConfidenceReport),
}

/// Outputs of finished nodes for one run.
#[derive(Debug, Default)]
struct Artifacts {
    ctx: Option<PrContext>,
    requirements: Option<RequirementSet>,
    documentation: Option<DocumentationSet>,
    alignment: Option<AlignmentResult>,
    consistency: Option<ConsistencyResult>,
    cross: Option<CrossReferenceResult>,
    signals: Option<QualitySignals>,
    gaps: Option<Vec<Gap>>,
    score: Option<ConfidenceScore>,
    recommendations: Option<Vec<ActionItem>>,
    report: Option<ConfidenceReport>,
    degraded: bool,
}

impl Artifacts {
    fn store(&mut self, output: NodeOutput) {
        match output {
            NodeOutput::Context(v) => self.ctx = Some(v),
            NodeOutput::Requirements(v) => self.requirements = Some(v),
            NodeOutput::Documentation(v) => self.documentation = Some(v),
            NodeOutput::Alignment(v) => self.alignment = Some(v),
            NodeOutput::Consistency(v) => self.consistency = Some(v),
            NodeOutput::Cross(v) => self.cross = Some(v),
            NodeOutput::Signals(v) => self.signals = v,
            NodeOutput::Gaps(v) => self.gaps = Some(v),
            NodeOutput::Score(v) => self.score = Some(v),
            NodeOutput::Recommendations(v) => self.recommendations = Some(v),
            NodeOutput::Report(v) => self.report = Some(v),
        }
    }

    /// Best-effort degraded report once a score exists.
    fn salvage(&self) -> Option<ConfidenceReport> {
        let ctx = self.ctx.as_ref()?;
        let score = self.score.as_ref()?;
        let cross = self.cross.as_ref()?;
        let gaps = self.gaps.as_deref().unwrap_or_default();
        let recommendations = self.recommendations.as_deref().unwrap_or_default();
        Some(build_report(
            &ReportInputs {
                ctx,
                score,
                cross,
                alignment: self.alignment.as_ref(),
                consistency: self.consistency.as_ref(),
                gaps,
                recommendations,
                degraded: true,
            },
            Utc::now(),
        ))
    }
}

fn need<'a, T>(slot: &'a Option<T>, consumer: NodeId, producer: NodeId) -> Result<&'a T> {
    slot.as_ref().ok_or_else(|| PipelineError::MissingInput {
        node: consumer.to_string(),
        detail: format!("no output from {producer}"),
    })
}

/// Fetch-error marker for a fetch node that failed outright.
fn fetch_marker(err: &PipelineError, source_name: &str) -> FetchError {
    match err {
        PipelineError::Fetch(inner) => inner.clone(),
        other => FetchError::Unavailable {
            source_name: source_name.to_string(),
            reason: other.to_string(),
        },
    }
}

fn join_fetch_errors(errors: &[FetchError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

struct NodeRun {
    node: NodeId,
    attempts: u32,
    result: Result<NodeOutput>,
}

enum Stop {
    Finished,
    /// Cancellation or budget exhaustion between or during groups.
    Interrupted(PipelineError),
    /// A required node failed.
    Aborted(PipelineError),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Wires collaborators into a [`WorkflowEngine`].
///
/// Unset sources serve empty sets and the scorer defaults to
/// [`LexicalScorer`]. Signals, notifier, store and progress sink are
/// optional.
pub struct EngineBuilder {
    config: PipelineConfig,
    requirements: Option<Arc<dyn RequirementSource>>,
    documentation: Option<Arc<dyn DocumentationSource>>,
    scorer: Option<Arc<dyn Scorer>>,
    signals: Option<Arc<dyn SignalProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
    store: Option<Arc<dyn ReportStore>>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl EngineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            requirements: None,
            documentation: None,
            scorer: None,
            signals: None,
            notifier: None,
            store: None,
            progress: None,
        }
    }

    pub fn requirement_source(mut self, source: Arc<dyn RequirementSource>) -> Self {
        self.requirements = Some(source);
        self
    }

    pub fn documentation_source(mut self, source: Arc<dyn DocumentationSource>) -> Self {
        self.documentation = Some(source);
        self
    }

    pub fn scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn signal_provider(mut self, provider: Arc<dyn SignalProvider>) -> Self {
        self.signals = Some(provider);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn report_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Validate configuration and the DAG, then build the engine.
    pub fn build(self) -> Result<WorkflowEngine> {
        self.config.validate()?;
        let matcher = self.config.paths.compile()?;
        let graph = WorkflowGraph::standard()?;
        let scorer = self
            .scorer
            .unwrap_or_else(|| Arc::new(LexicalScorer::new()));
        let scoring = ScoringClient::new(scorer, self.config.runtime.call_timeout());
        Ok(WorkflowEngine {
            retry: RetryPolicy::from_runtime(&self.config.runtime),
            config: self.config,
            matcher,
            graph,
            requirements: self
                .requirements
                .unwrap_or_else(|| Arc::new(StaticRequirementSource::default())),
            documentation: self
                .documentation
                .unwrap_or_else(|| Arc::new(StaticDocumentationSource::default())),
            scoring,
            signals: self.signals,
            notifier: self.notifier,
            store: self.store,
            progress: self.progress,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct WorkflowEngine {
    config: PipelineConfig,
    matcher: PathMatcher,
    graph: WorkflowGraph,
    retry: RetryPolicy,
    requirements: Arc<dyn RequirementSource>,
    documentation: Arc<dyn DocumentationSource>,
    scoring: ScoringClient,
    signals: Option<Arc<dyn SignalProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
    store: Option<Arc<dyn ReportStore>>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl WorkflowEngine {
    pub fn builder(config: PipelineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Run one workflow instance to completion.
    pub async fn run(&self, trigger: impl Into<Trigger>) -> WorkflowOutcome {
        self.run_with_cancel(trigger, CancellationToken::new()).await
    }

    /// Run with an external cancellation token. Cancellation is observed
    /// between node groups; in-flight calls are not aborted.
    pub async fn run_with_cancel(
        &self,
        trigger: impl Into<Trigger>,
        cancel: CancellationToken,
    ) -> WorkflowOutcome {
        let trigger = trigger.into();
        let rc = RunContext::new(self.config.runtime.budget(), cancel);
        self.execute(&trigger, &rc).await
    }

    #[instrument(
        name = "prconf.workflow",
        skip_all,
        fields(run_id = %rc.run_id(), repository = %trigger.repository(), pr_id = %trigger.pr_id())
    )]
    async fn execute(&self, trigger: &Trigger, rc: &RunContext) -> WorkflowOutcome {
        let mut state = WorkflowState::new(rc.run_id(), self.graph.nodes());
        let mut arts = Artifacts::default();
        obs::emit_workflow_started(rc.run_id(), &trigger.repository(), &trigger.pr_id());

        let (status, report, error) = match self.drive(trigger, rc, &mut state, &mut arts).await {
            Ok(Stop::Finished) => (OverallStatus::Completed, arts.report.take(), None),
            Ok(Stop::Interrupted(err)) => {
                state.log_error(err.kind(), None, err.to_string());
                state.skip_pending();
                let salvaged = arts.salvage();
                let status = if salvaged.is_some() {
                    OverallStatus::PartiallyCompleted
                } else {
                    OverallStatus::Failed
                };
                (status, salvaged, Some(err))
            }
            Ok(Stop::Aborted(err)) => {
                state.skip_pending();
                (OverallStatus::Failed, None, Some(err))
            }
            Err(err) => {
                state.log_error(ErrorKind::Internal, None, err.to_string());
                state.skip_pending();
                (OverallStatus::Failed, None, Some(err))
            }
        };
        if let Err(err) = state.set_status(status) {
            state.log_error(err.kind(), None, err.to_string());
        }

        let mut report_id = None;
        if let Some(report) = &report {
            obs::emit_report_built(
                rc.run_id(),
                report.score(),
                &report.recommendation().to_string(),
                report.gaps().len(),
            );
            report_id = self.persist(report, rc, &mut state).await;
            self.notify(report, report_id.clone(), rc).await;
        }

        obs::emit_workflow_finished(
            rc.run_id(),
            &status.to_string(),
            rc.elapsed().as_millis() as u64,
            report.as_ref().is_some_and(ConfidenceReport::degraded),
        );
        WorkflowOutcome {
            state,
            report,
            report_id,
            error,
        }
    }

    async fn drive(
        &self,
        trigger: &Trigger,
        rc: &RunContext,
        state: &mut WorkflowState,
        arts: &mut Artifacts,
    ) -> Result<Stop> {
        state.set_status(OverallStatus::Running)?;

        for group in self.graph.execution_groups() {
            if rc.is_cancelled() {
                return Ok(Stop::Interrupted(PipelineError::Cancelled));
            }
            if rc.deadline_passed() {
                return Ok(Stop::Interrupted(self.budget_exceeded()));
            }
            for node in &group {
                state.transition(*node, NodeStatus::Running)?;
            }

            let shared: &Artifacts = arts;
            let pending = join_all(
                group
                    .iter()
                    .map(|node| self.run_node(*node, shared, rc, trigger)),
            );
            let runs = match tokio::time::timeout_at(rc.deadline(), pending).await {
                Ok(runs) => runs,
                Err(_) => {
                    for node in &group {
                        state.transition(*node, NodeStatus::Skipped)?;
                    }
                    return Ok(Stop::Interrupted(self.budget_exceeded()));
                }
            };
            if rc.is_cancelled() {
                debug!(nodes = ?group, "discarding results of a cancelled group");
                for node in &group {
                    state.transition(*node, NodeStatus::Skipped)?;
                }
                return Ok(Stop::Interrupted(PipelineError::Cancelled));
            }

            let mut fatal = None;
            for run in runs {
                if let Some(err) = self.apply(run, rc, state, arts)? {
                    fatal.get_or_insert(err);
                }
            }
            self.report_progress(&group, rc, state).await;
            if let Some(err) = fatal {
                return Ok(Stop::Aborted(err));
            }
        }
        Ok(Stop::Finished)
    }

    async fn report_progress(&self, group: &[NodeId], rc: &RunContext, state: &WorkflowState) {
        let Some(sink) = &self.progress else {
            return;
        };
        for node in group {
            let Some(status) = state.node_status(*node) else {
                continue;
            };
            let call = sink.node_finished(rc.run_id(), *node, status);
            if tokio::time::timeout(self.config.runtime.call_timeout(), call)
                .await
                .is_err()
            {
                debug!(node = %node, "progress sink timed out");
            }
        }
    }

    fn budget_exceeded(&self) -> PipelineError {
        PipelineError::Timeout {
            budget_ms: self.config.runtime.budget().as_millis() as u64,
        }
    }

    /// Record a finished node. Returns the error of a failed required node.
    fn apply(
        &self,
        run: NodeRun,
        rc: &RunContext,
        state: &mut WorkflowState,
        arts: &mut Artifacts,
    ) -> Result<Option<PipelineError>> {
        let NodeRun {
            node,
            attempts,
            result,
        } = run;
        state.add_retries(node, attempts.saturating_sub(1));

        let (status, fatal) = match result {
            Ok(output) => {
                self.note_degradation(node, &output, state, arts);
                arts.store(output);
                (NodeStatus::Succeeded, None)
            }
            Err(err) => {
                state.log_error(err.kind(), Some(node), err.to_string());
                match self.fallback(node, &err, arts) {
                    Some(output) => {
                        arts.degraded = true;
                        arts.store(output);
                        (NodeStatus::Failed, None)
                    }
                    None => (NodeStatus::Failed, Some(err)),
                }
            }
        };
        state.transition(node, status)?;
        obs::emit_node_finished(rc.run_id(), node.name(), &status.to_string(), attempts);
        Ok(fatal)
    }

    /// Mark the run degraded for successful outputs that still rest on
    /// defaults or partial data.
    fn note_degradation(
        &self,
        node: NodeId,
        output: &NodeOutput,
        state: &mut WorkflowState,
        arts: &mut Artifacts,
    ) {
        let partial = match output {
            NodeOutput::Requirements(set) => &set.fetch_errors,
            NodeOutput::Documentation(set) => &set.fetch_errors,
            NodeOutput::Alignment(a) => {
                arts.degraded |= a.is_degraded();
                return;
            }
            NodeOutput::Consistency(c) => {
                arts.degraded |= c.is_degraded();
                return;
            }
            _ => return,
        };
        if !partial.is_empty() {
            state.log_error(ErrorKind::Fetch, Some(node), join_fetch_errors(partial));
            arts.degraded = true;
        }
    }

    /// Documented default output of an optional node.
    fn fallback(&self, node: NodeId, err: &PipelineError, arts: &Artifacts) -> Option<NodeOutput> {
        let reason = err.to_string();
        let output = match node {
            NodeId::ExtractContext | NodeId::ScoreConfidence | NodeId::BuildReport => return None,
            NodeId::FetchRequirements => NodeOutput::Requirements(RequirementSet::failed(
                fetch_marker(err, "requirements"),
            )),
            NodeId::FetchDocumentation => NodeOutput::Documentation(DocumentationSet::failed(
                fetch_marker(err, "documentation"),
            )),
            NodeId::AnalyzeAlignment => {
                NodeOutput::Alignment(AlignmentResult::neutral(ScoreSource::Fallback { reason }))
            }
            NodeId::AnalyzeConsistency => NodeOutput::Consistency(ConsistencyResult::neutral(
                ScoreSource::Fallback { reason },
            )),
            NodeId::CrossReference => {
                let fallback = || ScoreSource::Fallback {
                    reason: reason.clone(),
                };
                let alignment = arts
                    .alignment
                    .clone()
                    .unwrap_or_else(|| AlignmentResult::neutral(fallback()));
                let consistency = arts
                    .consistency
                    .clone()
                    .unwrap_or_else(|| ConsistencyResult::neutral(fallback()));
                NodeOutput::Cross(percentages_only(
                    &alignment,
                    &consistency,
                    &self.config.weights,
                ))
            }
            NodeId::CollectSignals => NodeOutput::Signals(None),
            NodeId::DetectGaps => NodeOutput::Gaps(evidence_gaps(
                &arts.requirements.clone().unwrap_or_default(),
                &arts.documentation.clone().unwrap_or_default(),
            )),
            NodeId::GenerateRecommendations => NodeOutput::Recommendations(Vec::new()),
        };
        Some(output)
    }

    async fn run_node(
        &self,
        node: NodeId,
        arts: &Artifacts,
        rc: &RunContext,
        trigger: &Trigger,
    ) -> NodeRun {
        let attempted = retry_transient(
            &self.retry,
            rc.cancel_token(),
            || self.attempt(node, arts, rc, trigger),
            |attempt, err| obs::emit_node_retrying(rc.run_id(), node.name(), attempt, err),
        )
        .await;
        NodeRun {
            node,
            attempts: attempted.attempts,
            result: attempted.result,
        }
    }

    /// One attempt at a node.
    async fn attempt(
        &self,
        node: NodeId,
        arts: &Artifacts,
        rc: &RunContext,
        trigger: &Trigger,
    ) -> Result<NodeOutput> {
        let cfg = &self.config;
        let call_timeout = cfg.runtime.call_timeout();
        let timeout_ms = cfg.runtime.call_timeout_ms;

        let output = match node {
            NodeId::ExtractContext => {
                let ctx = match trigger {
                    Trigger::Event(event) => extract_context(event, &cfg.impact, &self.matcher)?,
                    Trigger::Payload(payload) => {
                        extract_from_value(payload.clone(), &cfg.impact, &self.matcher)?
                    }
                };
                NodeOutput::Context(ctx)
            }
            NodeId::FetchRequirements => {
                let ctx = need(&arts.ctx, node, NodeId::ExtractContext)?;
                let set = tokio::time::timeout(call_timeout, self.requirements.fetch(ctx))
                    .await
                    .map_err(|_| FetchError::Timeout {
                        source_name: "requirements".to_string(),
                        timeout_ms,
                    })?;
                NodeOutput::Requirements(set)
            }
            NodeId::FetchDocumentation => {
                let ctx = need(&arts.ctx, node, NodeId::ExtractContext)?;
                let set = tokio::time::timeout(call_timeout, self.documentation.fetch(ctx))
                    .await
                    .map_err(|_| FetchError::Timeout {
                        source_name: "documentation".to_string(),
                        timeout_ms,
                    })?;
                NodeOutput::Documentation(set)
            }
            NodeId::AnalyzeAlignment => {
                let ctx = need(&arts.ctx, node, NodeId::ExtractContext)?;
                let reqs = need(&arts.requirements, node, NodeId::FetchRequirements)?;
                NodeOutput::Alignment(analyze_alignment(&self.scoring, ctx, reqs, rc).await?)
            }
            NodeId::AnalyzeConsistency => {
                let ctx = need(&arts.ctx, node, NodeId::ExtractContext)?;
                let docs = need(&arts.documentation, node, NodeId::FetchDocumentation)?;
                NodeOutput::Consistency(analyze_consistency(&self.scoring, ctx, docs, rc).await?)
            }
            NodeId::CrossReference => NodeOutput::Cross(cross_reference(
                need(&arts.ctx, node, NodeId::ExtractContext)?,
                need(&arts.requirements, node, NodeId::FetchRequirements)?,
                need(&arts.documentation, node, NodeId::FetchDocumentation)?,
                need(&arts.alignment, node, NodeId::AnalyzeAlignment)?,
                need(&arts.consistency, node, NodeId::AnalyzeConsistency)?,
                &cfg.weights,
            )),
            NodeId::CollectSignals => {
                let ctx = need(&arts.ctx, node, NodeId::ExtractContext)?;
                let signals = match &self.signals {
                    None => None,
                    Some(provider) => Some(
                        tokio::time::timeout(call_timeout, provider.collect(ctx))
                            .await
                            .map_err(|_| FetchError::Timeout {
                                source_name: "signals".to_string(),
                                timeout_ms,
                            })??,
                    ),
                };
                NodeOutput::Signals(signals)
            }
            NodeId::DetectGaps => {
                let inputs = GapInputs {
                    ctx: need(&arts.ctx, node, NodeId::ExtractContext)?,
                    requirements: need(&arts.requirements, node, NodeId::FetchRequirements)?,
                    documentation: need(&arts.documentation, node, NodeId::FetchDocumentation)?,
                    alignment: arts.alignment.as_ref(),
                    consistency: arts.consistency.as_ref(),
                    cross: arts.cross.as_ref(),
                    signals: arts.signals.as_ref(),
                };
                NodeOutput::Gaps(detect_gaps(&inputs, &cfg.gaps))
            }
            NodeId::ScoreConfidence => NodeOutput::Score(score_confidence(
                need(&arts.cross, node, NodeId::CrossReference)?,
                arts.signals.as_ref(),
                need(&arts.gaps, node, NodeId::DetectGaps)?,
                cfg,
            )),
            NodeId::GenerateRecommendations => NodeOutput::Recommendations(
                generate_recommendations(need(&arts.gaps, node, NodeId::DetectGaps)?),
            ),
            NodeId::BuildReport => {
                let inputs = ReportInputs {
                    ctx: need(&arts.ctx, node, NodeId::ExtractContext)?,
                    score: need(&arts.score, node, NodeId::ScoreConfidence)?,
                    cross: need(&arts.cross, node, NodeId::CrossReference)?,
                    alignment: arts.alignment.as_ref(),
                    consistency: arts.consistency.as_ref(),
                    gaps: need(&arts.gaps, node, NodeId::DetectGaps)?,
                    recommendations: need(
                        &arts.recommendations,
                        node,
                        NodeId::GenerateRecommendations,
                    )?,
                    degraded: arts.degraded,
                };
                NodeOutput::Report(build_report(&inputs, Utc::now()))
            }
        };
        Ok(output)
    }

    /// Hand the report to the store. Failures are recorded, never fatal.
    async fn persist(
        &self,
        report: &ConfidenceReport,
        rc: &RunContext,
        state: &mut WorkflowState,
    ) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.persist(report).await {
            Ok(id) => {
                obs::emit_report_persisted(rc.run_id(), &id);
                Some(id)
            }
            Err(err) => {
                obs::emit_report_persist_failed(rc.run_id(), &err);
                state.log_error(ErrorKind::Persistence, None, err.to_string());
                None
            }
        }
    }

    /// Publish the summary within the per-call timeout. Failures are logged.
    async fn notify(&self, report: &ConfidenceReport, report_id: Option<String>, rc: &RunContext) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let summary = report.summary(report_id);
        match tokio::time::timeout(self.config.runtime.call_timeout(), notifier.publish(&summary))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => obs::emit_report_notify_failed(rc.run_id(), &err),
            Err(_) => obs::emit_report_notify_failed(rc.run_id(), &"notifier timed out"),
        }
    }
}
