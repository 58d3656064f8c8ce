//! Confidence scoring: weighted composite, risk penalty, level and
//! recommendation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{PenaltyMode, PenaltyPolicy, PipelineConfig};
use crate::domain::analysis::{CrossReferenceResult, NEUTRAL_SCORE};
use crate::domain::gap::{Gap, Severity};
use crate::domain::report::{Component, ConfidenceLevel, Recommendation};
use crate::domain::sources::QualitySignals;

/// Output of the scoring stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// `100 * Σ(component * weight)` before the penalty.
    pub base: f64,
    pub penalty_factor: f64,
    pub score: u8,
    pub level: ConfidenceLevel,
    pub recommendation: Recommendation,
    pub component_scores: BTreeMap<Component, f64>,
}

fn signal(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => NEUTRAL_SCORE,
    }
}

/// Component values in `[0, 1]`. Missing signals default to neutral.
pub fn component_scores(
    cross: &CrossReferenceResult,
    signals: Option<&QualitySignals>,
) -> BTreeMap<Component, f64> {
    let sig = signals.cloned().unwrap_or_default();
    Component::ALL
        .iter()
        .map(|c| {
            let value = match c {
                Component::RequirementsAlignment => (cross.alignment_pct / 100.0).clamp(0.0, 1.0),
                Component::DocumentationConsistency => {
                    (cross.consistency_pct / 100.0).clamp(0.0, 1.0)
                }
                Component::TestCoverage => signal(sig.test_coverage),
                Component::CodeQuality => signal(sig.code_quality),
                Component::SecurityAssessment => signal(sig.security_assessment),
            };
            (*c, value)
        })
        .collect()
}

/// Combined risk penalty in `[floor, 1]`.
pub fn penalty_factor(gaps: &[Gap], policy: &PenaltyPolicy) -> f64 {
    let count = |severity: Severity| {
        gaps.iter().filter(|g| g.severity() == severity).count() as u32
    };
    let raw = match policy.mode {
        PenaltyMode::Multiplicative => policy
            .rules
            .iter()
            .map(|r| {
                let n = count(r.severity).min(r.max_applications);
                r.multiplier.powi(n as i32)
            })
            .product::<f64>(),
        PenaltyMode::Subtractive => {
            1.0 - policy
                .rules
                .iter()
                .map(|r| {
                    let n = count(r.severity).min(r.max_applications);
                    (1.0 - r.multiplier) * f64::from(n)
                })
                .sum::<f64>()
        }
    };
    raw.clamp(policy.floor, 1.0)
}

/// Compute the final score from components and classified gaps.
pub fn score_confidence(
    cross: &CrossReferenceResult,
    signals: Option<&QualitySignals>,
    gaps: &[Gap],
    config: &PipelineConfig,
) -> ConfidenceScore {
    let component_scores = component_scores(cross, signals);
    let base = 100.0
        * component_scores
            .iter()
            .map(|(c, v)| v * config.weights.components.get(*c))
            .sum::<f64>();
    let penalty_factor = penalty_factor(gaps, &config.penalty);
    let score = (base * penalty_factor).clamp(0.0, 100.0).round() as u8;

    let level = config.level_for(score);
    let recommendation = if gaps.iter().any(|g| g.blocking()) {
        config.recommendations.blocking
    } else {
        config.recommendation_for(score)
    };

    ConfidenceScore {
        base,
        penalty_factor,
        score,
        level,
        recommendation,
        component_scores,
    }
}
