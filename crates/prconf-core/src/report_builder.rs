//! Report assembly. Pure: no scores are recomputed here.

use chrono::{DateTime, Utc};

use crate::confidence::ConfidenceScore;
use crate::domain::analysis::{AlignmentResult, ConsistencyResult, CrossReferenceResult, Dimension};
use crate::domain::gap::Gap;
use crate::domain::pr::PrContext;
use crate::domain::report::{ActionItem, ConfidenceReport, ReportParts};

const STRENGTH_THRESHOLD: f64 = 0.8;

/// Inputs to [`build_report`].
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub ctx: &'a PrContext,
    pub score: &'a ConfidenceScore,
    pub cross: &'a CrossReferenceResult,
    pub alignment: Option<&'a AlignmentResult>,
    pub consistency: Option<&'a ConsistencyResult>,
    pub gaps: &'a [Gap],
    pub recommendations: &'a [ActionItem],
    pub degraded: bool,
}

fn strengths(inputs: &ReportInputs<'_>) -> Vec<String> {
    let mut out: Vec<String> = inputs
        .score
        .component_scores
        .iter()
        .filter(|(_, v)| **v >= STRENGTH_THRESHOLD)
        .map(|(c, v)| format!("strong {} ({:.2})", c.label(), v))
        .collect();

    if let Some(a) = inputs.alignment.filter(|a| a.is_scored()) {
        out.extend(
            a.iter()
                .filter(|(d, v)| *v >= 1.0 && !a.imputed.contains(d))
                .map(|(d, _)| format!("full marks on {}", d.label())),
        );
    }
    if let Some(c) = inputs.consistency.filter(|c| c.is_scored()) {
        out.extend(
            c.iter()
                .filter(|(d, v)| *v >= 1.0 && !c.imputed.contains(d))
                .map(|(d, _)| format!("full marks on {}", d.label())),
        );
    }
    out
}

pub fn build_report(inputs: &ReportInputs<'_>, generated_at: DateTime<Utc>) -> ConfidenceReport {
    let critical_concerns = inputs
        .gaps
        .iter()
        .filter(|g| g.blocking())
        .map(|g| g.description().to_string())
        .collect();

    ConfidenceReport::from_parts(ReportParts {
        repository: inputs.ctx.repository().to_string(),
        pr_id: inputs.ctx.id().to_string(),
        score: inputs.score.score,
        level: inputs.score.level,
        recommendation: inputs.score.recommendation,
        component_scores: inputs.score.component_scores.clone(),
        alignment_pct: inputs.cross.alignment_pct,
        consistency_pct: inputs.cross.consistency_pct,
        penalty_factor: inputs.score.penalty_factor,
        gaps: inputs.gaps.to_vec(),
        recommendations: inputs.recommendations.to_vec(),
        critical_concerns,
        strengths: strengths(inputs),
        degraded: inputs.degraded,
        generated_at,
    })
}
