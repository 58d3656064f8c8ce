//! Structured observability hooks for the workflow lifecycle.
//!
//! Every event carries a stable `event` field so log pipelines can filter on
//! it. Events are emitted at `info!` unless they report a failure.

use tracing::{info, warn};

/// RAII guard that enters a run-scoped tracing span.
///
/// ```ignore
/// let _span = RunSpan::enter("4b0c...");
/// // every event below is tagged with run_id
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("prconf.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_workflow_started(run_id: &str, repository: &str, pr_id: &str) {
    info!(
        event = "workflow.started",
        run_id = %run_id,
        repository = %repository,
        pr_id = %pr_id,
    );
}

/// Emit event: a node reached a terminal status.
pub fn emit_node_finished(run_id: &str, node: &str, status: &str, attempts: u32) {
    info!(
        event = "workflow.node_finished",
        run_id = %run_id,
        node = %node,
        status = %status,
        attempts = attempts,
    );
}

/// Emit event: a transient failure will be retried (warning level).
pub fn emit_node_retrying(
    run_id: &str,
    node: &str,
    attempt: u32,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "workflow.node_retrying",
        run_id = %run_id,
        node = %node,
        attempt = attempt,
        error = %error,
    );
}

pub fn emit_workflow_finished(run_id: &str, status: &str, duration_ms: u64, degraded: bool) {
    info!(
        event = "workflow.finished",
        run_id = %run_id,
        status = %status,
        duration_ms = duration_ms,
        degraded = degraded,
    );
}

pub fn emit_report_built(run_id: &str, score: u8, recommendation: &str, gaps: usize) {
    info!(
        event = "report.built",
        run_id = %run_id,
        score = score,
        recommendation = %recommendation,
        gaps = gaps,
    );
}

pub fn emit_report_persisted(run_id: &str, report_id: &str) {
    info!(event = "report.persisted", run_id = %run_id, report_id = %report_id);
}

pub fn emit_report_persist_failed(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "report.persist_failed", run_id = %run_id, error = %error);
}

pub fn emit_report_notify_failed(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "report.notify_failed", run_id = %run_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_and_events_do_not_panic() {
        let _span = RunSpan::enter("test-run");
        emit_workflow_started("test-run", "org/app", "1");
        emit_node_finished("test-run", "extract_context", "succeeded", 1);
        emit_node_retrying("test-run", "fetch_requirements", 1, &"timeout");
        emit_workflow_finished("test-run", "completed", 12, false);
    }
}
