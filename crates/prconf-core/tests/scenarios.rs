//! End-to-end reference scenarios for the confidence workflow.

use std::sync::Arc;
use std::time::Duration;

use prconf_core::collab::{StaticDocumentationSource, StaticRequirementSource, StaticSignalProvider};
use prconf_core::config::PipelineConfig;
use prconf_core::context::extract_context;
use prconf_core::fakes::{SlowRequirementSource, StubScorer};
use prconf_core::{
    ConfidenceLevel, DocRef, DocumentationSet, ErrorKind, FileChange, GapType, ImpactScope,
    NodeId, NodeStatus, OverallStatus, QualitySignals, Recommendation, Requirement,
    RequirementSet, Severity, SignalFinding, SignalStrength, TriggerEvent, WorkflowEngine,
};

fn event(files: Vec<FileChange>, refs: &[&str]) -> TriggerEvent {
    TriggerEvent {
        repository: "org/app".to_string(),
        pr_id: "101".to_string(),
        title: "Admin dashboard".to_string(),
        description: "Adds the admin dashboard view".to_string(),
        file_changes: files,
        author: "dev".to_string(),
        linked_requirement_refs: refs.iter().map(|r| r.to_string()).collect(),
    }
}

// -------------------------------------------------------------------------
// Scenario A: trivial change, no requirements, no documentation
// -------------------------------------------------------------------------

#[tokio::test]
async fn scenario_a_trivial_change_without_evidence() {
    let ev = event(vec![FileChange::new("src/lib.rs", 5, 2)], &[]);

    let cfg = PipelineConfig::default();
    let matcher = cfg.paths.compile().unwrap();
    let ctx = extract_context(&ev, &cfg.impact, &matcher).unwrap();
    assert_eq!(ctx.impact_scope(), ImpactScope::Trivial);

    let scorer = Arc::new(StubScorer::uniform(0.9));
    let engine = WorkflowEngine::builder(cfg)
        .scorer(scorer.clone())
        .build()
        .unwrap();
    let outcome = engine.run(ev).await;

    assert_eq!(outcome.status(), OverallStatus::Completed);
    let report = outcome.report.expect("report");

    // no evidence: neither analyzer calls the scorer and both default to 0.5
    assert_eq!(scorer.calls(), 0);
    assert!((report.alignment_pct() - 50.0).abs() < 1e-9);
    assert!((report.consistency_pct() - 50.0).abs() < 1e-9);

    assert_eq!(report.score(), 50);
    assert_eq!(report.level(), ConfidenceLevel::HighRisk);
    assert_eq!(report.recommendation(), Recommendation::Hold);

    let gaps: Vec<_> = report
        .gaps()
        .iter()
        .map(|g| (g.gap_type(), g.severity(), g.blocking()))
        .collect();
    assert_eq!(
        gaps,
        vec![
            (GapType::Requirements, Severity::Medium, false),
            (GapType::Documentation, Severity::Medium, false),
        ]
    );
    assert!(!report.degraded());
    assert!(outcome.state.error_log().is_empty());
}

// -------------------------------------------------------------------------
// Scenario B: perfect analyses but one critical security finding
// -------------------------------------------------------------------------

#[tokio::test]
async fn scenario_b_critical_gap_forces_hold() {
    let ev = event(vec![FileChange::new("src/admin.rs", 20, 0)], &["APP-1"]);
    let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "Admin dashboard")
        .with_criteria(["admins can see the dashboard"])]);
    let docs = DocumentationSet::new(vec![DocRef::new(
        "DOC-1",
        "Admin guide",
        "The admin dashboard lists users.",
    )]);
    let signals = QualitySignals {
        test_coverage: Some(1.0),
        code_quality: Some(1.0),
        security_assessment: Some(1.0),
        findings: vec![SignalFinding {
            gap_type: GapType::Security,
            strength: SignalStrength::Strong,
            description: "new endpoint POST /api/admin lacks an auth check".to_string(),
        }],
    };

    let engine = WorkflowEngine::builder(PipelineConfig::default())
        .requirement_source(Arc::new(StaticRequirementSource::new(reqs)))
        .documentation_source(Arc::new(StaticDocumentationSource::new(docs)))
        .signal_provider(Arc::new(StaticSignalProvider::new(signals)))
        .scorer(Arc::new(StubScorer::uniform(1.0)))
        .build()
        .unwrap();
    let outcome = engine.run(ev).await;

    assert_eq!(outcome.status(), OverallStatus::Completed);
    let report = outcome.report.expect("report");

    assert!((report.alignment_pct() - 100.0).abs() < 1e-9);
    assert!((report.consistency_pct() - 100.0).abs() < 1e-9);
    assert!((report.penalty_factor() - 0.9).abs() < 1e-9);
    assert_eq!(report.score(), 90);
    assert_eq!(report.level(), ConfidenceLevel::Excellent);
    assert_eq!(report.recommendation(), Recommendation::Hold);

    assert_eq!(report.gaps().len(), 1);
    let gap = &report.gaps()[0];
    assert_eq!(gap.gap_type(), GapType::Security);
    assert_eq!(gap.severity(), Severity::Critical);
    assert!(gap.blocking());
    assert_eq!(
        report.critical_concerns(),
        ["new endpoint POST /api/admin lacks an auth check".to_string()]
    );
    assert!(!report.degraded());
}

// -------------------------------------------------------------------------
// Scenario C: requirement fetch times out, everything else succeeds
// -------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn scenario_c_requirement_fetch_timeout_degrades() {
    let mut cfg = PipelineConfig::default();
    cfg.runtime.call_timeout_ms = 100;
    cfg.runtime.backoff_base_ms = 10;

    let slow = Arc::new(SlowRequirementSource::new(
        Duration::from_secs(10),
        RequirementSet::new(vec![Requirement::new("APP-1", "Admin dashboard")]),
    ));
    let docs = DocumentationSet::new(vec![DocRef::new(
        "DOC-1",
        "Admin guide",
        "The admin dashboard lists users.",
    )]);
    let engine = WorkflowEngine::builder(cfg)
        .requirement_source(slow.clone())
        .documentation_source(Arc::new(StaticDocumentationSource::new(docs)))
        .scorer(Arc::new(StubScorer::uniform(0.8)))
        .build()
        .unwrap();

    let ev = event(vec![FileChange::new("src/admin.rs", 5, 2)], &[]);
    let outcome = engine.run(ev).await;

    assert_eq!(outcome.status(), OverallStatus::Completed);
    let state = &outcome.state;
    assert_eq!(
        state.node_status(NodeId::FetchRequirements),
        Some(NodeStatus::Failed)
    );
    assert_eq!(
        state.node_status(NodeId::FetchDocumentation),
        Some(NodeStatus::Succeeded)
    );
    assert_eq!(state.retries(NodeId::FetchRequirements), 2);
    assert_eq!(slow.calls(), 3);

    // exactly one entry, and it is the fetch failure
    assert_eq!(state.error_log().len(), 1);
    assert_eq!(state.errors_of_kind(ErrorKind::Fetch), 1);
    assert_eq!(state.error_log()[0].node, Some(NodeId::FetchRequirements));

    let report = outcome.report.expect("report");
    assert!(report.degraded());
    assert!((report.alignment_pct() - 50.0).abs() < 1e-9);
    assert!((report.consistency_pct() - 80.0).abs() < 1e-9);
    assert!(report
        .gaps()
        .iter()
        .any(|g| g.gap_type() == GapType::Requirements && g.severity() == Severity::Medium));
}
