//! Deterministic offline scorer based on term overlap.
//!
//! Used when no model backend is wired (CLI runs, reproducible fixtures).
//! Each evidence item is tokenized into lowercase terms of three or more
//! characters, minus stop words; its coverage is the fraction of those terms
//! that appear anywhere in the change text.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::collab::{AnalysisKind, DimensionPrompt, Scorer};
use crate::domain::error::ScoringError;
use crate::domain::pr::PrContext;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "should", "must", "will", "are", "was",
    "when", "then", "into", "have", "has", "not", "all", "any", "can", "each", "its", "per",
];

const ERROR_TERMS: &[&str] = &[
    "error", "err", "invalid", "reject", "fail", "empty", "none", "null", "overflow", "timeout",
    "retry", "bound",
];

const PERF_TERMS: &[&str] = &["cache", "batch", "index", "async", "stream", "pool", "limit"];

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .map(|t| t.to_ascii_lowercase())
        .filter(|t| t.len() >= 3 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

fn coverage(evidence: &BTreeSet<String>, change: &BTreeSet<String>) -> f64 {
    if evidence.is_empty() {
        return 0.5;
    }
    let hit = evidence.iter().filter(|t| change.contains(*t)).count();
    hit as f64 / evidence.len() as f64
}

fn mentions_any(change: &BTreeSet<String>, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|t| change.contains(*t))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer;

impl LexicalScorer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scorer for LexicalScorer {
    async fn score(
        &self,
        prompt: &DimensionPrompt,
        ctx: &PrContext,
    ) -> Result<BTreeMap<String, f64>, ScoringError> {
        let change = terms(&ctx.searchable_text());
        let per_item: Vec<f64> = prompt
            .evidence
            .iter()
            .map(|e| coverage(&terms(&e.text), &change))
            .collect();
        let mean = if per_item.is_empty() {
            0.5
        } else {
            per_item.iter().sum::<f64>() / per_item.len() as f64
        };
        let well_covered = if per_item.is_empty() {
            0.5
        } else {
            per_item.iter().filter(|c| **c >= 0.5).count() as f64 / per_item.len() as f64
        };
        let tests_touched = ctx.change_metrics().test_files_touched > 0;
        let handles_errors = mentions_any(&change, ERROR_TERMS);
        let lift = |on: bool| if on { 0.5 + 0.5 * mean } else { 0.5 * mean + 0.25 };

        let values: Vec<(&str, f64)> = match prompt.kind {
            AnalysisKind::Alignment => vec![
                ("functional_completeness", mean),
                ("acceptance_coverage", well_covered),
                ("test_coverage", lift(tests_touched)),
                ("edge_case_handling", lift(handles_errors)),
                ("performance", lift(mentions_any(&change, PERF_TERMS))),
            ],
            AnalysisKind::Consistency => {
                let removed: usize = ctx
                    .file_changes()
                    .iter()
                    .map(|fc| fc.removed_lines().count())
                    .sum();
                let added: usize = ctx
                    .file_changes()
                    .iter()
                    .map(|fc| fc.added_lines().count())
                    .sum();
                let churn = if added + removed == 0 {
                    0.0
                } else {
                    removed as f64 / (added + removed) as f64
                };
                vec![
                    ("api_contract", mean),
                    ("architecture", 0.5 + 0.5 * mean),
                    ("naming", well_covered.max(mean)),
                    ("error_handling", lift(handles_errors)),
                    ("version_compat", (1.0 - churn).clamp(0.0, 1.0)),
                ]
            }
        };

        Ok(values
            .into_iter()
            .filter(|(name, _)| prompt.dimensions.iter().any(|d| d == name))
            .map(|(name, v)| (name.to_string(), v.clamp(0.0, 1.0)))
            .collect())
    }
}
