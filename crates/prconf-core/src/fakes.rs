//! In-memory and fault-injecting collaborators (testing only).
//!
//! All fakes keep their state behind a `std::sync::Mutex` or atomics so they
//! can be shared across concurrent workflow runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::collab::{
    DimensionPrompt, DocumentationSource, Notifier, ProgressSink, ReportStore,
    RequirementSource, Scorer, SignalProvider,
};
use crate::domain::error::{FetchError, PersistenceError, ScoringError};
use crate::domain::pr::PrContext;
use crate::domain::report::{ConfidenceReport, ReportSummary};
use crate::domain::sources::{DocumentationSet, QualitySignals, RequirementSet};
use crate::store::FsReportStore;
use crate::workflow::{NodeId, NodeStatus};

// ---------------------------------------------------------------------------
// Scorers
// ---------------------------------------------------------------------------

/// Deterministic scorer returning preset values for every requested
/// dimension.
#[derive(Debug, Default)]
pub struct StubScorer {
    fixed: BTreeMap<String, f64>,
    fallback: Option<f64>,
    delay: Option<Duration>,
    calls: AtomicU32,
    last_prompt: Mutex<Option<DimensionPrompt>>,
}

impl StubScorer {
    /// Same value for every requested dimension.
    pub fn uniform(value: f64) -> Self {
        Self {
            fallback: Some(value),
            ..Self::default()
        }
    }

    /// Exact response map. Requested dimensions not in `scores` are omitted
    /// from the response.
    pub fn fixed(scores: BTreeMap<String, f64>) -> Self {
        Self {
            fixed: scores,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<DimensionPrompt> {
        self.last_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Scorer for StubScorer {
    async fn score(
        &self,
        prompt: &DimensionPrompt,
        _ctx: &PrContext,
    ) -> Result<BTreeMap<String, f64>, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut out = BTreeMap::new();
        for dim in &prompt.dimensions {
            if let Some(v) = self.fixed.get(dim).copied().or(self.fallback) {
                out.insert(dim.clone(), v);
            }
        }
        Ok(out)
    }
}

/// Fails with a transient backend error `failures` times, then delegates.
#[derive(Debug)]
pub struct FlakyScorer {
    inner: StubScorer,
    failures: u32,
    attempts: AtomicU32,
}

impl FlakyScorer {
    pub fn new(failures: u32, inner: StubScorer) -> Self {
        Self {
            inner,
            failures,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for FlakyScorer {
    async fn score(
        &self,
        prompt: &DimensionPrompt,
        ctx: &PrContext,
    ) -> Result<BTreeMap<String, f64>, ScoringError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(ScoringError::Backend(format!("injected failure #{}", n + 1)));
        }
        self.inner.score(prompt, ctx).await
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Requirement source that sleeps before answering.
#[derive(Debug)]
pub struct SlowRequirementSource {
    delay: Duration,
    set: RequirementSet,
    calls: AtomicU32,
}

impl SlowRequirementSource {
    pub fn new(delay: Duration, set: RequirementSet) -> Self {
        Self {
            delay,
            set,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequirementSource for SlowRequirementSource {
    async fn fetch(&self, _ctx: &PrContext) -> RequirementSet {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.set.clone()
    }
}

/// Documentation source that sleeps before answering.
#[derive(Debug)]
pub struct SlowDocumentationSource {
    delay: Duration,
    set: DocumentationSet,
    calls: AtomicU32,
}

impl SlowDocumentationSource {
    pub fn new(delay: Duration, set: DocumentationSet) -> Self {
        Self {
            delay,
            set,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentationSource for SlowDocumentationSource {
    async fn fetch(&self, _ctx: &PrContext) -> DocumentationSet {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.set.clone()
    }
}

/// Signal provider that is always unreachable.
#[derive(Debug, Default)]
pub struct FailingSignalProvider;

#[async_trait]
impl SignalProvider for FailingSignalProvider {
    async fn collect(&self, _ctx: &PrContext) -> Result<QualitySignals, FetchError> {
        Err(FetchError::Unavailable {
            source_name: "signals".to_string(),
            reason: "injected failure".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Report stores
// ---------------------------------------------------------------------------

/// In-memory report store keyed by report id.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<HashMap<String, ConfidenceReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn persist(&self, report: &ConfidenceReport) -> Result<String, PersistenceError> {
        let id = FsReportStore::report_id(report);
        let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        reports.insert(id.clone(), report.clone());
        Ok(id)
    }

    async fn load(&self, report_id: &str) -> Result<ConfidenceReport, PersistenceError> {
        let reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        reports
            .get(report_id)
            .cloned()
            .ok_or_else(|| PersistenceError::Backend(format!("report {report_id} not found")))
    }
}

/// Store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingReportStore;

#[async_trait]
impl ReportStore for FailingReportStore {
    async fn persist(&self, _report: &ConfidenceReport) -> Result<String, PersistenceError> {
        Err(PersistenceError::Backend("injected store failure".to_string()))
    }

    async fn load(&self, report_id: &str) -> Result<ConfidenceReport, PersistenceError> {
        Err(PersistenceError::Backend(format!(
            "injected store failure loading {report_id}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

/// Records every published summary.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    published: Mutex<Vec<ReportSummary>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<ReportSummary> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, summary: &ReportSummary) -> anyhow::Result<()> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(summary.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn publish(&self, _summary: &ReportSummary) -> anyhow::Result<()> {
        anyhow::bail!("injected notifier failure")
    }
}

// ---------------------------------------------------------------------------
// Progress sinks
// ---------------------------------------------------------------------------

/// Records `(node, status)` pairs in the order they were reported.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<(NodeId, NodeStatus)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(NodeId, NodeStatus)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn node_finished(&self, _run_id: &str, node: NodeId, status: NodeStatus) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((node, status));
    }
}

/// Cancels the run's token once `node` has finished.
#[derive(Debug)]
pub struct CancelAfterNode {
    node: NodeId,
    token: CancellationToken,
}

impl CancelAfterNode {
    pub fn new(node: NodeId, token: CancellationToken) -> Self {
        Self { node, token }
    }
}

#[async_trait]
impl ProgressSink for CancelAfterNode {
    async fn node_finished(&self, _run_id: &str, node: NodeId, _status: NodeStatus) {
        if node == self.node {
            self.token.cancel();
        }
    }
}
