//! The immutable confidence report and its vocabulary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::digest::digest_json;
use crate::domain::gap::{Gap, GapType};

/// Version of the serialized report layout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Scoring component of the composite confidence score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    RequirementsAlignment,
    DocumentationConsistency,
    TestCoverage,
    CodeQuality,
    SecurityAssessment,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::RequirementsAlignment,
        Component::DocumentationConsistency,
        Component::TestCoverage,
        Component::CodeQuality,
        Component::SecurityAssessment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::RequirementsAlignment => "requirements alignment",
            Self::DocumentationConsistency => "documentation consistency",
            Self::TestCoverage => "test coverage",
            Self::CodeQuality => "code quality",
            Self::SecurityAssessment => "security assessment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Excellent,
    Good,
    Acceptable,
    Concerning,
    HighRisk,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::Concerning => "concerning",
            Self::HighRisk => "high_risk",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    ConditionalApprove,
    Review,
    Hold,
    Reject,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Approve => "approve",
            Self::ConditionalApprove => "conditional_approve",
            Self::Review => "review",
            Self::Hold => "hold",
            Self::Reject => "reject",
        };
        f.write_str(s)
    }
}

/// Urgency of an action item. `Immediate` sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Immediate,
    ShortTerm,
    LongTerm,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::ShortTerm => write!(f, "short_term"),
            Self::LongTerm => write!(f, "long_term"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Small,
    Medium,
    Large,
}

impl Effort {
    /// One step larger, saturating at `Large`.
    pub fn bump(self) -> Self {
        match self {
            Self::Small => Self::Medium,
            Self::Medium | Self::Large => Self::Large,
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

/// A deduplicated remediation step for one or more gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub gap_type: GapType,
    pub priority: Priority,
    pub effort: Effort,
    pub action: String,
    /// Every gap this item resolves, in report order.
    pub gap_ids: Vec<String>,
}

/// Immutable result of one workflow run.
///
/// Fields are private; the only constructor is crate-internal so a built
/// report cannot be altered afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    schema_version: String,
    repository: String,
    pr_id: String,
    score: u8,
    level: ConfidenceLevel,
    recommendation: Recommendation,
    component_scores: BTreeMap<Component, f64>,
    alignment_pct: f64,
    consistency_pct: f64,
    penalty_factor: f64,
    gaps: Vec<Gap>,
    recommendations: Vec<ActionItem>,
    critical_concerns: Vec<String>,
    strengths: Vec<String>,
    degraded: bool,
    generated_at: DateTime<Utc>,
}

/// Inputs for [`ConfidenceReport`] construction, grouped to keep the
/// constructor readable.
#[derive(Debug, Clone)]
pub(crate) struct ReportParts {
    pub repository: String,
    pub pr_id: String,
    pub score: u8,
    pub level: ConfidenceLevel,
    pub recommendation: Recommendation,
    pub component_scores: BTreeMap<Component, f64>,
    pub alignment_pct: f64,
    pub consistency_pct: f64,
    pub penalty_factor: f64,
    pub gaps: Vec<Gap>,
    pub recommendations: Vec<ActionItem>,
    pub critical_concerns: Vec<String>,
    pub strengths: Vec<String>,
    pub degraded: bool,
    pub generated_at: DateTime<Utc>,
}

impl ConfidenceReport {
    pub(crate) fn from_parts(parts: ReportParts) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            repository: parts.repository,
            pr_id: parts.pr_id,
            score: parts.score,
            level: parts.level,
            recommendation: parts.recommendation,
            component_scores: parts.component_scores,
            alignment_pct: parts.alignment_pct,
            consistency_pct: parts.consistency_pct,
            penalty_factor: parts.penalty_factor,
            gaps: parts.gaps,
            recommendations: parts.recommendations,
            critical_concerns: parts.critical_concerns,
            strengths: parts.strengths,
            degraded: parts.degraded,
            generated_at: parts.generated_at,
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn pr_id(&self) -> &str {
        &self.pr_id
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn level(&self) -> ConfidenceLevel {
        self.level
    }

    pub fn recommendation(&self) -> Recommendation {
        self.recommendation
    }

    pub fn component_scores(&self) -> &BTreeMap<Component, f64> {
        &self.component_scores
    }

    pub fn alignment_pct(&self) -> f64 {
        self.alignment_pct
    }

    pub fn consistency_pct(&self) -> f64 {
        self.consistency_pct
    }

    pub fn penalty_factor(&self) -> f64 {
        self.penalty_factor
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    pub fn recommendations(&self) -> &[ActionItem] {
        &self.recommendations
    }

    pub fn critical_concerns(&self) -> &[String] {
        &self.critical_concerns
    }

    pub fn strengths(&self) -> &[String] {
        &self.strengths
    }

    pub fn degraded(&self) -> bool {
        self.degraded
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn has_blocking_gap(&self) -> bool {
        self.gaps.iter().any(|g| g.blocking())
    }

    /// Digest over every field except `generated_at`.
    ///
    /// Two runs over identical inputs produce the same content digest.
    pub fn content_digest(&self) -> String {
        let mut value = match serde_json::to_value(self) {
            Ok(v) => v,
            Err(_) => return String::new(),
        };
        if let Some(obj) = value.as_object_mut() {
            obj.remove("generated_at");
        }
        digest_json(&value).unwrap_or_default()
    }

    pub fn summary(&self, report_id: Option<String>) -> ReportSummary {
        ReportSummary {
            repository: self.repository.clone(),
            pr_id: self.pr_id.clone(),
            score: self.score,
            level: self.level,
            recommendation: self.recommendation,
            gap_count: self.gaps.len(),
            blocking_gap_count: self.gaps.iter().filter(|g| g.blocking()).count(),
            degraded: self.degraded,
            report_id,
        }
    }
}

/// Compact projection handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub repository: String,
    pub pr_id: String,
    pub score: u8,
    pub level: ConfidenceLevel,
    pub recommendation: Recommendation,
    pub gap_count: usize,
    pub blocking_gap_count: usize,
    pub degraded: bool,
    pub report_id: Option<String>,
}
