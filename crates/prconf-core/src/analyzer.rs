//! Alignment and consistency analyzers.
//!
//! Each analyzer issues one scorer call per dimension set. The call runs as
//! its own tokio task with a timeout and a child cancellation token; results
//! are memoized in the run context so a retried node sees the same scores.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::collab::{AnalysisKind, DimensionPrompt, Evidence, Scorer};
use crate::domain::analysis::{
    AlignmentDimension, AlignmentResult, ConsistencyDimension, ConsistencyResult, Dimension,
    DimensionScores, ScoreSource,
};
use crate::domain::error::ScoringError;
use crate::domain::pr::PrContext;
use crate::domain::sources::{DocumentationSet, RequirementSet};
use crate::workflow::run_context::RunContext;

const ALIGNMENT_INSTRUCTIONS: &str = "Rate how well the change satisfies the linked requirements. \
Return one number in [0, 1] per dimension, keyed by dimension name.";

const CONSISTENCY_INSTRUCTIONS: &str = "Rate how well the change matches the documented contracts \
and architecture. Return one number in [0, 1] per dimension, keyed by dimension name.";

fn dimension_names<D: Dimension>() -> Vec<String> {
    D::ALL.iter().map(|d| d.name().to_string()).collect()
}

pub fn alignment_prompt(requirements: &RequirementSet) -> DimensionPrompt {
    DimensionPrompt {
        kind: AnalysisKind::Alignment,
        dimensions: dimension_names::<AlignmentDimension>(),
        instructions: ALIGNMENT_INSTRUCTIONS.to_string(),
        evidence: requirements
            .requirements
            .iter()
            .map(|r| Evidence {
                reference: r.ticket_id.clone(),
                text: r.text(),
            })
            .collect(),
    }
}

pub fn consistency_prompt(docs: &DocumentationSet) -> DimensionPrompt {
    DimensionPrompt {
        kind: AnalysisKind::Consistency,
        dimensions: dimension_names::<ConsistencyDimension>(),
        instructions: CONSISTENCY_INSTRUCTIONS.to_string(),
        evidence: docs
            .docs
            .iter()
            .map(|d| Evidence {
                reference: d.id.clone(),
                text: format!("{}\n{}", d.title, d.content),
            })
            .collect(),
    }
}

/// Scorer handle plus the per-call bound.
#[derive(Clone)]
pub struct ScoringClient {
    scorer: Arc<dyn Scorer>,
    timeout: Duration,
}

impl ScoringClient {
    pub fn new(scorer: Arc<dyn Scorer>, timeout: Duration) -> Self {
        Self { scorer, timeout }
    }

    /// One scorer call, served from the run memo when possible.
    pub async fn score(
        &self,
        prompt: &DimensionPrompt,
        ctx: &PrContext,
        set_digest: String,
        rc: &RunContext,
    ) -> Result<BTreeMap<String, f64>, ScoringError> {
        let key = (ctx.digest(), set_digest, prompt.kind);
        if let Some(hit) = rc.memo().get(&key) {
            debug!(kind = %prompt.kind, "scorer memo hit");
            return Ok(hit);
        }

        let token = rc.cancel_token().child_token();
        let scorer = Arc::clone(&self.scorer);
        let timeout = self.timeout;
        let task_prompt = prompt.clone();
        let task_ctx = ctx.clone();
        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, scorer.score(&task_prompt, &task_ctx)).await {
                Ok(result) => result,
                Err(_) => Err(ScoringError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            }
        });

        // A cancelled run stops waiting; the in-flight call finishes on its
        // own and its result is dropped.
        let raw = tokio::select! {
            joined = handle => joined
                .map_err(|e| ScoringError::Backend(format!("scorer task failed: {e}")))??,
            _ = token.cancelled() => return Err(ScoringError::Cancelled),
        };

        if raw.is_empty() {
            return Err(ScoringError::MalformedResponse(
                "response contained no dimensions".to_string(),
            ));
        }
        rc.memo().insert(key, raw.clone());
        Ok(raw)
    }
}

async fn analyze<D: Dimension>(
    client: &ScoringClient,
    prompt: DimensionPrompt,
    ctx: &PrContext,
    set_digest: String,
    evidence_missing: Option<ScoreSource>,
    rc: &RunContext,
) -> Result<DimensionScores<D>, ScoringError> {
    if let Some(source) = evidence_missing {
        return Ok(DimensionScores::neutral(source));
    }
    let raw = client.score(&prompt, ctx, set_digest, rc).await?;
    Ok(DimensionScores::from_scored(&raw))
}

/// Neutral source to use when a set has nothing to score against.
fn missing_evidence(empty: bool, fetch_failed: bool, what: &str) -> Option<ScoreSource> {
    match (empty, fetch_failed) {
        (false, _) => None,
        (true, false) => Some(ScoreSource::NoEvidence),
        (true, true) => Some(ScoreSource::Fallback {
            reason: format!("{what} could not be fetched"),
        }),
    }
}

/// Score the change against its requirements.
///
/// An empty requirement set yields neutral scores without a scorer call.
pub async fn analyze_alignment(
    client: &ScoringClient,
    ctx: &PrContext,
    requirements: &RequirementSet,
    rc: &RunContext,
) -> Result<AlignmentResult, ScoringError> {
    let missing = missing_evidence(
        requirements.is_empty(),
        !requirements.fetch_errors.is_empty(),
        "requirements",
    );
    analyze(
        client,
        alignment_prompt(requirements),
        ctx,
        requirements.digest(),
        missing,
        rc,
    )
    .await
}

/// Score the change against its documentation.
pub async fn analyze_consistency(
    client: &ScoringClient,
    ctx: &PrContext,
    docs: &DocumentationSet,
    rc: &RunContext,
) -> Result<ConsistencyResult, ScoringError> {
    let missing = missing_evidence(docs.is_empty(), !docs.fetch_errors.is_empty(), "documentation");
    analyze(client, consistency_prompt(docs), ctx, docs.digest(), missing, rc).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::context::extract_context;
    use crate::domain::error::FetchError;
    use crate::domain::pr::{FileChange, TriggerEvent};
    use crate::domain::sources::{DocRef, Requirement};
    use crate::fakes::StubScorer;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> PrContext {
        let cfg = PipelineConfig::default();
        let matcher = cfg.paths.compile().unwrap();
        let event = TriggerEvent {
            repository: "org/app".to_string(),
            pr_id: "1".to_string(),
            title: "Add login endpoint".to_string(),
            description: String::new(),
            file_changes: vec![FileChange::new("src/api.rs", 5, 0)],
            author: "dev".to_string(),
            linked_requirement_refs: vec![],
        };
        extract_context(&event, &cfg.impact, &matcher).unwrap()
    }

    fn run() -> RunContext {
        RunContext::new(Duration::from_secs(60), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_empty_requirements_skip_scorer() {
        let stub = Arc::new(StubScorer::uniform(0.9));
        let client = ScoringClient::new(stub.clone(), Duration::from_secs(1));
        let result = analyze_alignment(&client, &ctx(), &RequirementSet::default(), &run())
            .await
            .unwrap();
        assert_eq!(result.source, ScoreSource::NoEvidence);
        assert!(result.iter().all(|(_, v)| v == 0.5));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_fallback() {
        let stub = Arc::new(StubScorer::uniform(0.9));
        let client = ScoringClient::new(stub, Duration::from_secs(1));
        let set = RequirementSet::failed(FetchError::Timeout {
            source_name: "requirements".to_string(),
            timeout_ms: 10,
        });
        let result = analyze_alignment(&client, &ctx(), &set, &run()).await.unwrap();
        assert!(result.is_degraded());
    }

    #[tokio::test]
    async fn test_scores_are_memoized_per_run() {
        let stub = Arc::new(StubScorer::uniform(0.8));
        let client = ScoringClient::new(stub.clone(), Duration::from_secs(1));
        let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "login")]);
        let rc = run();
        let ctx = ctx();

        let a = analyze_alignment(&client, &ctx, &reqs, &rc).await.unwrap();
        let b = analyze_alignment(&client, &ctx, &reqs, &rc).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(stub.calls(), 1);

        // A fresh run does not see the previous memo.
        analyze_alignment(&client, &ctx, &reqs, &run()).await.unwrap();
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_consistency_uses_doc_evidence() {
        let stub = Arc::new(StubScorer::uniform(1.0));
        let client = ScoringClient::new(stub.clone(), Duration::from_secs(1));
        let docs = DocumentationSet::new(vec![DocRef::new("D1", "API", "POST /api/login")]);
        let result = analyze_consistency(&client, &ctx(), &docs, &run()).await.unwrap();
        assert!(result.is_scored());
        assert_eq!(result.get(ConsistencyDimension::ApiContract), 1.0);
        let prompt = stub.last_prompt().unwrap();
        assert_eq!(prompt.kind, AnalysisKind::Consistency);
        assert_eq!(prompt.evidence[0].reference, "D1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scorer_timeout() {
        let stub = Arc::new(StubScorer::uniform(0.7).with_delay(Duration::from_secs(5)));
        let client = ScoringClient::new(stub, Duration::from_millis(100));
        let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "login")]);
        let err = analyze_alignment(&client, &ctx(), &reqs, &run()).await.unwrap_err();
        assert_eq!(err, ScoringError::Timeout { timeout_ms: 100 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_stops_waiting() {
        let stub = Arc::new(StubScorer::uniform(0.7).with_delay(Duration::from_secs(5)));
        let client = ScoringClient::new(stub, Duration::from_secs(30));
        let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "login")]);
        let token = CancellationToken::new();
        let rc = RunContext::new(Duration::from_secs(60), token.clone());
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        };
        let c = ctx();
        let (res, _) = tokio::join!(analyze_alignment(&client, &c, &reqs, &rc), cancel);
        assert_eq!(res.unwrap_err(), ScoringError::Cancelled);
        assert!(rc.memo().is_empty());
    }
}
