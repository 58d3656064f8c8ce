//! Gap & risk detection across the seven gap types.

use std::collections::HashMap;

use crate::config::GapThresholds;
use crate::domain::analysis::{CrossReferenceResult, Dimension, DimensionScores};
use crate::domain::gap::{sort_gaps, Gap, GapType, Severity, SignalStrength};
use crate::domain::pr::{ImpactScope, PrContext};
use crate::domain::sources::{DocumentationSet, QualitySignals, RequirementSet};
use crate::domain::{AlignmentResult, ConsistencyResult};

pub const NO_REQUIREMENTS: &str = "no linked requirements";
pub const NO_DOCUMENTATION: &str = "no linked documentation";

/// Everything the detector looks at. Absent upstream outputs (failed
/// optional nodes) are simply skipped.
#[derive(Debug, Clone, Copy)]
pub struct GapInputs<'a> {
    pub ctx: &'a PrContext,
    pub requirements: &'a RequirementSet,
    pub documentation: &'a DocumentationSet,
    pub alignment: Option<&'a AlignmentResult>,
    pub consistency: Option<&'a ConsistencyResult>,
    pub cross: Option<&'a CrossReferenceResult>,
    pub signals: Option<&'a QualitySignals>,
}

/// Gaps that depend only on which evidence sets are empty.
///
/// Also the fallback output when the detector node itself fails.
pub fn evidence_gaps(requirements: &RequirementSet, docs: &DocumentationSet) -> Vec<Gap> {
    let mut gaps = Vec::new();
    if requirements.is_empty() {
        gaps.push(Gap::new(GapType::Requirements, Severity::Medium, NO_REQUIREMENTS));
    }
    if docs.is_empty() {
        gaps.push(Gap::new(GapType::Documentation, Severity::Medium, NO_DOCUMENTATION));
    }
    gaps
}

fn shortfall_gaps<D: Dimension>(
    analysis: &str,
    scores: &DimensionScores<D>,
    thresholds: &GapThresholds,
    out: &mut Vec<Gap>,
) {
    // Neutral defaults are not evidence of a shortfall.
    if !scores.is_scored() {
        return;
    }
    for (dim, value) in scores.iter() {
        if scores.imputed.contains(&dim) {
            continue;
        }
        if let Some(strength) = thresholds.strength_for(value) {
            out.push(Gap::from_signal(
                dim.gap_type(),
                strength,
                format!("{analysis}: {} scored {:.2}", dim.label(), value),
            ));
        }
    }
}

fn context_gaps(ctx: &PrContext, out: &mut Vec<Gap>) {
    let scope = ctx.impact_scope();
    if scope == ImpactScope::Trivial {
        return;
    }
    let metrics = ctx.change_metrics();
    let untested = metrics.test_files_touched == 0;

    if scope >= ImpactScope::Moderate && untested {
        let strength = if scope == ImpactScope::Major {
            SignalStrength::Strong
        } else {
            SignalStrength::Moderate
        };
        out.push(Gap::from_signal(
            GapType::Testing,
            strength,
            format!(
                "{scope} change ({} lines across {} files) touches no test files",
                metrics.lines_changed(),
                metrics.files_touched
            ),
        ));
    }

    if metrics.security_sensitive && untested {
        let strength = if scope == ImpactScope::Major {
            SignalStrength::Moderate
        } else {
            SignalStrength::Weak
        };
        out.push(Gap::from_signal(
            GapType::Security,
            strength,
            format!(
                "security-sensitive paths changed without tests: {}",
                metrics.security_paths.join(", ")
            ),
        ));
    }

    if metrics.deployment_sensitive {
        out.push(Gap::from_signal(
            GapType::Deployment,
            SignalStrength::Weak,
            "deployment configuration or migrations changed",
        ));
    }
}

/// Collapse duplicate (type, description) pairs to the most severe instance.
fn dedup_most_severe(gaps: Vec<Gap>) -> Vec<Gap> {
    let mut best: HashMap<(GapType, String), Gap> = HashMap::new();
    for gap in gaps {
        let key = (gap.gap_type(), gap.description().to_string());
        match best.get(&key) {
            Some(existing) if existing.severity() >= gap.severity() => {}
            _ => {
                best.insert(key, gap);
            }
        }
    }
    best.into_values().collect()
}

/// Classify every deficiency and return them in report order.
pub fn detect_gaps(inputs: &GapInputs<'_>, thresholds: &GapThresholds) -> Vec<Gap> {
    let mut gaps = evidence_gaps(inputs.requirements, inputs.documentation);

    if let Some(alignment) = inputs.alignment {
        shortfall_gaps("alignment", alignment, thresholds, &mut gaps);
    }
    if let Some(consistency) = inputs.consistency {
        shortfall_gaps("consistency", consistency, thresholds, &mut gaps);
    }
    context_gaps(inputs.ctx, &mut gaps);
    if let Some(cross) = inputs.cross {
        gaps.extend(cross.cross_gaps.iter().cloned());
    }
    if let Some(signals) = inputs.signals {
        for finding in &signals.findings {
            gaps.push(Gap::from_signal(
                finding.gap_type,
                finding.strength,
                finding.description.trim(),
            ));
        }
    }

    let mut gaps = dedup_most_severe(gaps);
    sort_gaps(&mut gaps);
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::context::extract_context;
    use crate::domain::analysis::ScoreSource;
    use crate::domain::pr::{FileChange, TriggerEvent};
    use crate::domain::sources::{DocRef, Requirement, SignalFinding};
    use std::collections::BTreeMap;

    fn ctx(files: Vec<FileChange>) -> PrContext {
        let cfg = PipelineConfig::default();
        let matcher = cfg.paths.compile().unwrap();
        let event = TriggerEvent {
            repository: "org/app".to_string(),
            pr_id: "5".to_string(),
            title: "Change".to_string(),
            description: String::new(),
            file_changes: files,
            author: "dev".to_string(),
            linked_requirement_refs: vec![],
        };
        extract_context(&event, &cfg.impact, &matcher).unwrap()
    }

    fn detect(inputs: GapInputs<'_>) -> Vec<Gap> {
        detect_gaps(&inputs, &GapThresholds::default())
    }

    #[test]
    fn test_empty_sources_yield_two_medium_gaps() {
        let c = ctx(vec![FileChange::new("src/lib.rs", 5, 2)]);
        let reqs = RequirementSet::default();
        let docs = DocumentationSet::default();
        let alignment = AlignmentResult::neutral(ScoreSource::NoEvidence);
        let consistency = ConsistencyResult::neutral(ScoreSource::NoEvidence);
        let gaps = detect(GapInputs {
            ctx: &c,
            requirements: &reqs,
            documentation: &docs,
            alignment: Some(&alignment),
            consistency: Some(&consistency),
            cross: None,
            signals: None,
        });
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].gap_type(), GapType::Requirements);
        assert_eq!(gaps[0].description(), NO_REQUIREMENTS);
        assert_eq!(gaps[1].gap_type(), GapType::Documentation);
        assert!(gaps.iter().all(|g| g.severity() == Severity::Medium && !g.blocking()));
    }

    #[test]
    fn test_scored_shortfalls_become_gaps() {
        let c = ctx(vec![FileChange::new("src/lib.rs", 5, 2)]);
        let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "x")]);
        let docs = DocumentationSet::new(vec![DocRef::new("D1", "x", "y")]);
        let mut raw = BTreeMap::new();
        raw.insert("functional_completeness".to_string(), 0.1);
        raw.insert("acceptance_coverage".to_string(), 0.9);
        raw.insert("test_coverage".to_string(), 0.45);
        raw.insert("edge_case_handling".to_string(), 0.9);
        // performance omitted: imputed, never a gap
        let alignment = AlignmentResult::from_scored(&raw);
        let consistency = ConsistencyResult::uniform(1.0);
        let gaps = detect(GapInputs {
            ctx: &c,
            requirements: &reqs,
            documentation: &docs,
            alignment: Some(&alignment),
            consistency: Some(&consistency),
            cross: None,
            signals: None,
        });
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].gap_type(), GapType::Requirements);
        assert_eq!(gaps[0].severity(), Severity::High);
        assert_eq!(gaps[1].gap_type(), GapType::Testing);
        assert_eq!(gaps[1].severity(), Severity::Medium);
    }

    #[test]
    fn test_security_path_without_tests() {
        let c = ctx(vec![FileChange::new("src/auth/session.rs", 30, 4)]);
        let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "x")]);
        let docs = DocumentationSet::new(vec![DocRef::new("D1", "x", "y")]);
        let gaps = detect(GapInputs {
            ctx: &c,
            requirements: &reqs,
            documentation: &docs,
            alignment: None,
            consistency: None,
            cross: None,
            signals: None,
        });
        let types: Vec<_> = gaps.iter().map(|g| (g.gap_type(), g.severity())).collect();
        assert_eq!(
            types,
            vec![
                (GapType::Testing, Severity::Medium),
                (GapType::Security, Severity::Medium),
            ]
        );
    }

    #[test]
    fn test_signal_finding_critical_blocks() {
        let c = ctx(vec![]);
        let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "x")]);
        let docs = DocumentationSet::new(vec![DocRef::new("D1", "x", "y")]);
        let signals = QualitySignals {
            findings: vec![
                SignalFinding {
                    gap_type: GapType::Security,
                    strength: SignalStrength::Strong,
                    description: "POST /api/admin has no auth check".to_string(),
                },
                SignalFinding {
                    gap_type: GapType::Security,
                    strength: SignalStrength::Weak,
                    description: "POST /api/admin has no auth check".to_string(),
                },
            ],
            ..QualitySignals::default()
        };
        let gaps = detect(GapInputs {
            ctx: &c,
            requirements: &reqs,
            documentation: &docs,
            alignment: None,
            consistency: None,
            cross: None,
            signals: Some(&signals),
        });
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].severity(), Severity::Critical);
        assert!(gaps[0].blocking());
    }

    #[test]
    fn test_deployment_path_flagged() {
        let c = ctx(vec![
            FileChange::new("db/migrations/002_users.sql", 20, 0),
            FileChange::new("tests/users.rs", 20, 0),
        ]);
        let reqs = RequirementSet::new(vec![Requirement::new("APP-1", "x")]);
        let docs = DocumentationSet::new(vec![DocRef::new("D1", "x", "y")]);
        let gaps = detect(GapInputs {
            ctx: &c,
            requirements: &reqs,
            documentation: &docs,
            alignment: None,
            consistency: None,
            cross: None,
            signals: None,
        });
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].gap_type(), GapType::Deployment);
        assert_eq!(gaps[0].severity(), Severity::Low);
    }
}
