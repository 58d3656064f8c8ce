//! Analysis dimensions and per-dimension score maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::gap::{Gap, GapType};

/// Neutral value used whenever a dimension cannot be evidenced.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// A closed set of scored dimensions.
pub trait Dimension: Copy + Ord + std::fmt::Debug + Send + Sync + 'static {
    /// Every dimension in declaration order.
    const ALL: &'static [Self];

    /// Stable wire name, used in scorer prompts and responses.
    fn name(self) -> &'static str;

    /// Human-readable label for reports.
    fn label(self) -> &'static str;

    /// Gap category raised when this dimension falls short.
    fn gap_type(self) -> GapType;

    fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL.iter().copied().find(|d| d.name() == wanted)
    }
}

/// PR-vs-requirements dimensions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentDimension {
    FunctionalCompleteness,
    AcceptanceCoverage,
    TestCoverage,
    EdgeCaseHandling,
    Performance,
}

impl Dimension for AlignmentDimension {
    const ALL: &'static [Self] = &[
        Self::FunctionalCompleteness,
        Self::AcceptanceCoverage,
        Self::TestCoverage,
        Self::EdgeCaseHandling,
        Self::Performance,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::FunctionalCompleteness => "functional_completeness",
            Self::AcceptanceCoverage => "acceptance_coverage",
            Self::TestCoverage => "test_coverage",
            Self::EdgeCaseHandling => "edge_case_handling",
            Self::Performance => "performance",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::FunctionalCompleteness => "functional completeness",
            Self::AcceptanceCoverage => "acceptance criteria coverage",
            Self::TestCoverage => "test coverage",
            Self::EdgeCaseHandling => "edge-case handling",
            Self::Performance => "performance",
        }
    }

    fn gap_type(self) -> GapType {
        match self {
            Self::FunctionalCompleteness | Self::AcceptanceCoverage => GapType::Requirements,
            Self::TestCoverage => GapType::Testing,
            Self::EdgeCaseHandling => GapType::CodeQuality,
            Self::Performance => GapType::Performance,
        }
    }
}

/// PR-vs-documentation dimensions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyDimension {
    ApiContract,
    Architecture,
    Naming,
    ErrorHandling,
    VersionCompat,
}

impl Dimension for ConsistencyDimension {
    const ALL: &'static [Self] = &[
        Self::ApiContract,
        Self::Architecture,
        Self::Naming,
        Self::ErrorHandling,
        Self::VersionCompat,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::ApiContract => "api_contract",
            Self::Architecture => "architecture",
            Self::Naming => "naming",
            Self::ErrorHandling => "error_handling",
            Self::VersionCompat => "version_compat",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::ApiContract => "API contract",
            Self::Architecture => "architecture",
            Self::Naming => "naming conventions",
            Self::ErrorHandling => "error handling",
            Self::VersionCompat => "version compatibility",
        }
    }

    fn gap_type(self) -> GapType {
        match self {
            Self::ApiContract => GapType::Documentation,
            Self::Architecture | Self::Naming | Self::ErrorHandling => GapType::CodeQuality,
            Self::VersionCompat => GapType::Deployment,
        }
    }
}

/// Where a set of dimension scores came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScoreSource {
    /// Returned by the scorer (possibly served from the per-run memo).
    Scored,
    /// No evidence was linked; neutral defaults apply. Not degraded.
    NoEvidence,
    /// Scorer or upstream fetch failed; neutral defaults apply. Degraded.
    Fallback { reason: String },
}

/// Scores for every dimension of `D`, each clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores<D: Dimension> {
    scores: BTreeMap<D, f64>,
    pub source: ScoreSource,
    /// Dimensions the scorer omitted; filled with the neutral value.
    pub imputed: Vec<D>,
}

impl<D: Dimension> DimensionScores<D> {
    /// Every dimension at the neutral value.
    pub fn neutral(source: ScoreSource) -> Self {
        Self {
            scores: D::ALL.iter().map(|d| (*d, NEUTRAL_SCORE)).collect(),
            source,
            imputed: Vec::new(),
        }
    }

    /// Build from a scorer response, clamping values and imputing gaps.
    ///
    /// Unknown keys are ignored; non-finite values count as missing.
    pub fn from_scored(raw: &BTreeMap<String, f64>) -> Self {
        let mut scores = BTreeMap::new();
        for (name, value) in raw {
            if let Some(dim) = D::from_name(name) {
                if value.is_finite() {
                    scores.insert(dim, value.clamp(0.0, 1.0));
                }
            }
        }
        let mut imputed = Vec::new();
        for dim in D::ALL {
            if !scores.contains_key(dim) {
                scores.insert(*dim, NEUTRAL_SCORE);
                imputed.push(*dim);
            }
        }
        Self {
            scores,
            source: ScoreSource::Scored,
            imputed,
        }
    }

    /// Uniform score on every dimension (clamped). Handy for fixtures.
    pub fn uniform(value: f64) -> Self {
        let v = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            NEUTRAL_SCORE
        };
        Self {
            scores: D::ALL.iter().map(|d| (*d, v)).collect(),
            source: ScoreSource::Scored,
            imputed: Vec::new(),
        }
    }

    pub fn get(&self, dim: D) -> f64 {
        self.scores.get(&dim).copied().unwrap_or(NEUTRAL_SCORE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (D, f64)> + '_ {
        self.scores.iter().map(|(d, v)| (*d, *v))
    }

    /// Scores keyed by wire name.
    pub fn to_named(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(d, v)| (d.name().to_string(), v)).collect()
    }

    /// Whether these scores were evidenced by the scorer.
    pub fn is_scored(&self) -> bool {
        matches!(self.source, ScoreSource::Scored)
    }

    /// Fallback defaults or imputed dimensions make a result degraded.
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, ScoreSource::Fallback { .. }) || !self.imputed.is_empty()
    }
}

pub type AlignmentResult = DimensionScores<AlignmentDimension>;
pub type ConsistencyResult = DimensionScores<ConsistencyDimension>;

/// Merged view of both analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReferenceResult {
    /// Weighted alignment mean, in percent (0-100).
    pub alignment_pct: f64,
    /// Weighted consistency mean, in percent (0-100).
    pub consistency_pct: f64,
    pub cross_gaps: Vec<Gap>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_normalizes() {
        assert_eq!(
            AlignmentDimension::from_name("Edge-Case Handling"),
            Some(AlignmentDimension::EdgeCaseHandling)
        );
        assert_eq!(
            ConsistencyDimension::from_name("api_contract"),
            Some(ConsistencyDimension::ApiContract)
        );
        assert_eq!(ConsistencyDimension::from_name("bogus"), None);
    }

    #[test]
    fn test_from_scored_clamps_and_imputes() {
        let mut raw = BTreeMap::new();
        raw.insert("functional_completeness".to_string(), 1.7);
        raw.insert("acceptance_coverage".to_string(), -0.2);
        raw.insert("test_coverage".to_string(), f64::NAN);
        raw.insert("unknown".to_string(), 0.9);
        let result = AlignmentResult::from_scored(&raw);

        assert_eq!(result.get(AlignmentDimension::FunctionalCompleteness), 1.0);
        assert_eq!(result.get(AlignmentDimension::AcceptanceCoverage), 0.0);
        assert_eq!(result.get(AlignmentDimension::TestCoverage), NEUTRAL_SCORE);
        assert_eq!(
            result.imputed,
            vec![
                AlignmentDimension::TestCoverage,
                AlignmentDimension::EdgeCaseHandling,
                AlignmentDimension::Performance
            ]
        );
        assert!(result.is_degraded());
    }

    #[test]
    fn test_neutral_no_evidence_is_not_degraded() {
        let result = ConsistencyResult::neutral(ScoreSource::NoEvidence);
        assert!(!result.is_degraded());
        assert!(!result.is_scored());
        assert!(result.iter().all(|(_, v)| v == NEUTRAL_SCORE));
    }

    #[test]
    fn test_fallback_is_degraded() {
        let result = AlignmentResult::neutral(ScoreSource::Fallback {
            reason: "timeout".to_string(),
        });
        assert!(result.is_degraded());
    }

    #[test]
    fn test_dimension_gap_types_cover_all() {
        for d in AlignmentDimension::ALL {
            let _ = d.gap_type();
        }
        assert_eq!(
            ConsistencyDimension::VersionCompat.gap_type(),
            GapType::Deployment
        );
    }
}
