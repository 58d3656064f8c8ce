//! Pipeline configuration: weights, penalty policy, band tables, path globs
//! and runtime limits.
//!
//! Every section carries `#[serde(default)]`, so a TOML file only needs the
//! keys it overrides. [`PipelineConfig::validate`] runs at startup.

use std::path::Path;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::analysis::{AlignmentDimension, ConsistencyDimension};
use crate::domain::error::ConfigError;
use crate::domain::gap::{Severity, SignalStrength};
use crate::domain::pr::ImpactScope;
use crate::domain::report::{Component, ConfidenceLevel, Recommendation};

const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub weights: WeightsConfig,
    pub penalty: PenaltyPolicy,
    pub levels: Vec<LevelBand>,
    pub recommendations: RecommendationPolicy,
    pub impact: ImpactThresholds,
    pub paths: PathGlobs,
    pub gaps: GapThresholds,
    pub runtime: RuntimeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weights: WeightsConfig::default(),
            penalty: PenaltyPolicy::default(),
            levels: default_levels(),
            recommendations: RecommendationPolicy::default(),
            impact: ImpactThresholds::default(),
            paths: PathGlobs::default(),
            gaps: GapThresholds::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.penalty.validate()?;
        validate_bands("levels", self.levels.iter().map(|b| b.min_score))?;
        validate_bands(
            "recommendations",
            self.recommendations.bands.iter().map(|b| b.min_score),
        )?;
        self.impact.validate()?;
        self.gaps.validate()?;
        self.runtime.validate()?;
        self.paths.compile()?;
        Ok(())
    }

    /// First level band whose lower bound the score reaches.
    pub fn level_for(&self, score: u8) -> ConfidenceLevel {
        self.levels
            .iter()
            .find(|b| score >= b.min_score)
            .map(|b| b.level)
            .unwrap_or(ConfidenceLevel::HighRisk)
    }

    /// Score-based recommendation, before the blocking override.
    pub fn recommendation_for(&self, score: u8) -> Recommendation {
        self.recommendations
            .bands
            .iter()
            .find(|b| score >= b.min_score)
            .map(|b| b.recommendation)
            .unwrap_or(Recommendation::Reject)
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub components: ComponentWeights,
    pub alignment: AlignmentWeights,
    pub consistency: ConsistencyWeights,
}

impl WeightsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_weight_set("components", &self.components.entries())?;
        check_weight_set("alignment", &self.alignment.entries())?;
        check_weight_set("consistency", &self.consistency.entries())
    }
}

fn check_weight_set(
    set: &'static str,
    entries: &[(&'static str, f64)],
) -> Result<(), ConfigError> {
    for &(name, value) in entries {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidWeight { set, name, value });
        }
    }
    let sum: f64 = entries.iter().map(|(_, v)| v).sum();
    if (sum - 1.0).abs() > WEIGHT_EPSILON {
        return Err(ConfigError::WeightSum { set, sum });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub requirements_alignment: f64,
    pub documentation_consistency: f64,
    pub test_coverage: f64,
    pub code_quality: f64,
    pub security_assessment: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            requirements_alignment: 0.30,
            documentation_consistency: 0.25,
            test_coverage: 0.20,
            code_quality: 0.15,
            security_assessment: 0.10,
        }
    }
}

impl ComponentWeights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::RequirementsAlignment => self.requirements_alignment,
            Component::DocumentationConsistency => self.documentation_consistency,
            Component::TestCoverage => self.test_coverage,
            Component::CodeQuality => self.code_quality,
            Component::SecurityAssessment => self.security_assessment,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("requirements_alignment", self.requirements_alignment),
            ("documentation_consistency", self.documentation_consistency),
            ("test_coverage", self.test_coverage),
            ("code_quality", self.code_quality),
            ("security_assessment", self.security_assessment),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentWeights {
    pub functional_completeness: f64,
    pub acceptance_coverage: f64,
    pub test_coverage: f64,
    pub edge_case_handling: f64,
    pub performance: f64,
}

impl Default for AlignmentWeights {
    fn default() -> Self {
        Self {
            functional_completeness: 0.30,
            acceptance_coverage: 0.25,
            test_coverage: 0.20,
            edge_case_handling: 0.15,
            performance: 0.10,
        }
    }
}

impl AlignmentWeights {
    pub fn get(&self, dim: AlignmentDimension) -> f64 {
        match dim {
            AlignmentDimension::FunctionalCompleteness => self.functional_completeness,
            AlignmentDimension::AcceptanceCoverage => self.acceptance_coverage,
            AlignmentDimension::TestCoverage => self.test_coverage,
            AlignmentDimension::EdgeCaseHandling => self.edge_case_handling,
            AlignmentDimension::Performance => self.performance,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("functional_completeness", self.functional_completeness),
            ("acceptance_coverage", self.acceptance_coverage),
            ("test_coverage", self.test_coverage),
            ("edge_case_handling", self.edge_case_handling),
            ("performance", self.performance),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyWeights {
    pub api_contract: f64,
    pub architecture: f64,
    pub naming: f64,
    pub error_handling: f64,
    pub version_compat: f64,
}

impl Default for ConsistencyWeights {
    fn default() -> Self {
        Self {
            api_contract: 0.30,
            architecture: 0.25,
            naming: 0.20,
            error_handling: 0.15,
            version_compat: 0.10,
        }
    }
}

impl ConsistencyWeights {
    pub fn get(&self, dim: ConsistencyDimension) -> f64 {
        match dim {
            ConsistencyDimension::ApiContract => self.api_contract,
            ConsistencyDimension::Architecture => self.architecture,
            ConsistencyDimension::Naming => self.naming,
            ConsistencyDimension::ErrorHandling => self.error_handling,
            ConsistencyDimension::VersionCompat => self.version_compat,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("api_contract", self.api_contract),
            ("architecture", self.architecture),
            ("naming", self.naming),
            ("error_handling", self.error_handling),
            ("version_compat", self.version_compat),
        ]
    }
}

// ---------------------------------------------------------------------------
// Penalty policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyMode {
    /// `Π multiplier^min(count, cap)`
    #[default]
    Multiplicative,
    /// `1 - Σ (1 - multiplier) * min(count, cap)`
    Subtractive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyRule {
    pub severity: Severity,
    pub multiplier: f64,
    pub max_applications: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyPolicy {
    pub mode: PenaltyMode,
    /// Lower bound of the combined factor.
    pub floor: f64,
    pub rules: Vec<PenaltyRule>,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            mode: PenaltyMode::Multiplicative,
            floor: 0.3,
            rules: vec![
                PenaltyRule {
                    severity: Severity::Critical,
                    multiplier: 0.9,
                    max_applications: 3,
                },
                PenaltyRule {
                    severity: Severity::High,
                    multiplier: 0.95,
                    max_applications: 5,
                },
            ],
        }
    }
}

impl PenaltyPolicy {
    pub fn rule_for(&self, severity: Severity) -> Option<&PenaltyRule> {
        self.rules.iter().find(|r| r.severity == severity)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.floor) {
            return Err(ConfigError::InvalidPenalty(format!(
                "floor {} outside [0, 1]",
                self.floor
            )));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if !(rule.multiplier > 0.0 && rule.multiplier <= 1.0) {
                return Err(ConfigError::InvalidPenalty(format!(
                    "{} multiplier {} outside (0, 1]",
                    rule.severity, rule.multiplier
                )));
            }
            if self.rules[..i].iter().any(|r| r.severity == rule.severity) {
                return Err(ConfigError::InvalidPenalty(format!(
                    "duplicate rule for {}",
                    rule.severity
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Band tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBand {
    pub min_score: u8,
    pub level: ConfidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationBand {
    pub min_score: u8,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    pub bands: Vec<RecommendationBand>,
    /// Forced whenever a blocking gap is present.
    pub blocking: Recommendation,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        let band = |min_score, recommendation| RecommendationBand {
            min_score,
            recommendation,
        };
        Self {
            bands: vec![
                band(80, Recommendation::Approve),
                band(70, Recommendation::ConditionalApprove),
                band(60, Recommendation::Review),
                band(40, Recommendation::Hold),
                band(0, Recommendation::Reject),
            ],
            blocking: Recommendation::Hold,
        }
    }
}

/// Default level table.
pub fn default_levels() -> Vec<LevelBand> {
    let band = |min_score, level| LevelBand { min_score, level };
    vec![
        band(90, ConfidenceLevel::Excellent),
        band(80, ConfidenceLevel::Good),
        band(70, ConfidenceLevel::Acceptable),
        band(60, ConfidenceLevel::Concerning),
        band(0, ConfidenceLevel::HighRisk),
    ]
}

fn validate_bands(
    table: &'static str,
    mins: impl Iterator<Item = u8>,
) -> Result<(), ConfigError> {
    let mins: Vec<u8> = mins.collect();
    let Some(last) = mins.last() else {
        return Err(ConfigError::InvalidBands {
            table,
            reason: "table is empty".to_string(),
        });
    };
    if mins.windows(2).any(|w| w[0] <= w[1]) {
        return Err(ConfigError::InvalidBands {
            table,
            reason: "min_score values must be strictly descending".to_string(),
        });
    }
    if *last != 0 {
        return Err(ConfigError::InvalidBands {
            table,
            reason: format!("last band starts at {last}, expected 0"),
        });
    }
    if mins[0] > 100 {
        return Err(ConfigError::InvalidBands {
            table,
            reason: format!("band start {} exceeds 100", mins[0]),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Impact classification
// ---------------------------------------------------------------------------

/// Inclusive upper bounds for one scope tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeBound {
    pub max_lines: u64,
    pub max_files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactThresholds {
    pub trivial: ScopeBound,
    pub minor: ScopeBound,
    pub moderate: ScopeBound,
}

impl Default for ImpactThresholds {
    fn default() -> Self {
        Self {
            trivial: ScopeBound {
                max_lines: 10,
                max_files: 2,
            },
            minor: ScopeBound {
                max_lines: 100,
                max_files: 5,
            },
            moderate: ScopeBound {
                max_lines: 500,
                max_files: 20,
            },
        }
    }
}

impl ImpactThresholds {
    /// Larger of the line-based and file-based tiers.
    pub fn classify(&self, lines_changed: u64, files_touched: usize) -> ImpactScope {
        let by_lines = if lines_changed <= self.trivial.max_lines {
            ImpactScope::Trivial
        } else if lines_changed <= self.minor.max_lines {
            ImpactScope::Minor
        } else if lines_changed <= self.moderate.max_lines {
            ImpactScope::Moderate
        } else {
            ImpactScope::Major
        };
        let by_files = if files_touched <= self.trivial.max_files {
            ImpactScope::Trivial
        } else if files_touched <= self.minor.max_files {
            ImpactScope::Minor
        } else if files_touched <= self.moderate.max_files {
            ImpactScope::Moderate
        } else {
            ImpactScope::Major
        };
        by_lines.max(by_files)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ordered = |a: ScopeBound, b: ScopeBound| {
            a.max_lines <= b.max_lines && a.max_files <= b.max_files
        };
        if !ordered(self.trivial, self.minor) || !ordered(self.minor, self.moderate) {
            return Err(ConfigError::InvalidBands {
                table: "impact",
                reason: "scope bounds must be non-decreasing".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Path globs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathGlobs {
    pub security_globs: Vec<String>,
    pub test_globs: Vec<String>,
    pub deployment_globs: Vec<String>,
}

impl Default for PathGlobs {
    fn default() -> Self {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            security_globs: owned(&[
                "**/auth/**",
                "**/*auth*",
                "**/security/**",
                "**/crypto/**",
                "**/*secret*",
                "**/*token*",
                "**/permissions/**",
                "**/.env*",
            ]),
            test_globs: owned(&[
                "**/tests/**",
                "**/test/**",
                "**/*_test.*",
                "**/*.test.*",
                "**/*_spec.*",
                "**/*.spec.*",
                "**/test_*",
            ]),
            deployment_globs: owned(&[
                "**/Dockerfile*",
                "**/migrations/**",
                "**/*.sql",
                "**/helm/**",
                "**/.github/workflows/**",
            ]),
        }
    }
}

impl PathGlobs {
    pub fn compile(&self) -> Result<PathMatcher, ConfigError> {
        Ok(PathMatcher {
            security: build_set(&self.security_globs)?,
            tests: build_set(&self.test_globs)?,
            deployment: build_set(&self.deployment_globs)?,
        })
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidGlob {
        pattern: patterns.join(","),
        reason: e.to_string(),
    })
}

/// Compiled path classifiers.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    security: GlobSet,
    tests: GlobSet,
    deployment: GlobSet,
}

impl PathMatcher {
    pub fn is_security_sensitive(&self, path: &str) -> bool {
        self.security.is_match(path)
    }

    pub fn is_test(&self, path: &str) -> bool {
        self.tests.is_match(path)
    }

    pub fn is_deployment(&self, path: &str) -> bool {
        self.deployment.is_match(path)
    }
}

// ---------------------------------------------------------------------------
// Gap thresholds
// ---------------------------------------------------------------------------

/// A scored dimension below `strong` is a strong shortfall signal, below
/// `moderate` a moderate one and below `weak` a weak one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapThresholds {
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            strong: 0.3,
            moderate: 0.5,
            weak: 0.6,
        }
    }
}

impl GapThresholds {
    pub fn strength_for(&self, score: f64) -> Option<SignalStrength> {
        if score < self.strong {
            Some(SignalStrength::Strong)
        } else if score < self.moderate {
            Some(SignalStrength::Moderate)
        } else if score < self.weak {
            Some(SignalStrength::Weak)
        } else {
            None
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ok = 0.0 <= self.strong
            && self.strong <= self.moderate
            && self.moderate <= self.weak
            && self.weak <= 1.0;
        if !ok {
            return Err(ConfigError::InvalidBands {
                table: "gaps",
                reason: "thresholds must satisfy 0 <= strong <= moderate <= weak <= 1".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Runtime limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Retries after the first attempt (0 = run once).
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Bound on each collaborator call (fetch, score, signals, notify).
    pub call_timeout_ms: u64,
    /// Wall-clock budget for one workflow instance.
    pub workflow_budget_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 250,
            call_timeout_ms: 30_000,
            workflow_budget_secs: 600,
        }
    }
}

impl RuntimeConfig {
    /// Upper bound accepted for `max_retries`.
    pub const MAX_RETRIES: u32 = 10;
    /// Upper bound accepted for `workflow_budget_secs` (one day).
    pub const MAX_BUDGET_SECS: u64 = 86_400;

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.workflow_budget_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::InvalidRuntime(
                "call_timeout_ms must be positive".to_string(),
            ));
        }
        if self.workflow_budget_secs == 0 || self.workflow_budget_secs > Self::MAX_BUDGET_SECS {
            return Err(ConfigError::InvalidRuntime(format!(
                "workflow_budget_secs must be in 1..={}, got {}",
                Self::MAX_BUDGET_SECS,
                self.workflow_budget_secs
            )));
        }
        if self.max_retries > Self::MAX_RETRIES {
            return Err(ConfigError::InvalidRuntime(format!(
                "max_retries must be at most {}, got {}",
                Self::MAX_RETRIES,
                self.max_retries
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.runtime.max_retries, 2);
        assert_eq!(cfg.levels.len(), 5);
    }

    #[test]
    fn test_level_and_recommendation_tables() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.level_for(100), ConfidenceLevel::Excellent);
        assert_eq!(cfg.level_for(90), ConfidenceLevel::Excellent);
        assert_eq!(cfg.level_for(89), ConfidenceLevel::Good);
        assert_eq!(cfg.level_for(60), ConfidenceLevel::Concerning);
        assert_eq!(cfg.level_for(50), ConfidenceLevel::HighRisk);

        assert_eq!(cfg.recommendation_for(80), Recommendation::Approve);
        assert_eq!(cfg.recommendation_for(79), Recommendation::ConditionalApprove);
        assert_eq!(cfg.recommendation_for(65), Recommendation::Review);
        assert_eq!(cfg.recommendation_for(50), Recommendation::Hold);
        assert_eq!(cfg.recommendation_for(10), Recommendation::Reject);
    }

    #[test]
    fn test_weight_sum_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.weights.components.code_quality = 0.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::WeightSum { set: "components", .. })
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.weights.alignment.performance = -0.1;
        cfg.weights.alignment.functional_completeness = 0.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidWeight { name: "performance", .. })
        ));
    }

    #[test]
    fn test_bands_must_descend_and_end_at_zero() {
        let mut cfg = PipelineConfig::default();
        cfg.levels.pop();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidBands { table: "levels", .. })
        ));

        let mut cfg = PipelineConfig::default();
        cfg.recommendations.bands.swap(0, 1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_penalty_multiplier_bounds() {
        let mut cfg = PipelineConfig::default();
        cfg.penalty.rules[0].multiplier = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidPenalty(_))));
    }

    #[test]
    fn test_impact_classification() {
        let t = ImpactThresholds::default();
        assert_eq!(t.classify(0, 0), ImpactScope::Trivial);
        assert_eq!(t.classify(7, 1), ImpactScope::Trivial);
        assert_eq!(t.classify(11, 1), ImpactScope::Minor);
        assert_eq!(t.classify(5, 6), ImpactScope::Moderate);
        assert_eq!(t.classify(501, 1), ImpactScope::Major);
    }

    #[test]
    fn test_default_globs() {
        let m = PathGlobs::default().compile().unwrap();
        assert!(m.is_security_sensitive("src/auth/login.rs"));
        assert!(m.is_security_sensitive("auth/mod.rs"));
        assert!(m.is_security_sensitive("config/.env.production"));
        assert!(!m.is_security_sensitive("src/lib.rs"));
        assert!(m.is_test("tests/login.rs"));
        assert!(m.is_test("web/login.spec.ts"));
        assert!(m.is_deployment("db/migrations/001_init.sql"));
        assert!(m.is_deployment("Dockerfile"));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.paths.security_globs.push("src/[".to_string());
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidGlob { .. })));
    }

    #[test]
    fn test_gap_threshold_strengths() {
        let t = GapThresholds::default();
        assert_eq!(t.strength_for(0.1), Some(SignalStrength::Strong));
        assert_eq!(t.strength_for(0.4), Some(SignalStrength::Moderate));
        assert_eq!(t.strength_for(0.55), Some(SignalStrength::Weak));
        assert_eq!(t.strength_for(0.5), Some(SignalStrength::Weak));
        assert_eq!(t.strength_for(0.6), None);
    }

    #[test]
    fn test_runtime_zero_timeout_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.runtime.call_timeout_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRuntime(_))));
    }

    #[test]
    fn test_runtime_ceilings() {
        let mut cfg = PipelineConfig::default();
        cfg.runtime.max_retries = RuntimeConfig::MAX_RETRIES;
        cfg.runtime.workflow_budget_secs = RuntimeConfig::MAX_BUDGET_SECS;
        cfg.validate().unwrap();

        cfg.runtime.max_retries = u32::MAX;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRuntime(_))));

        cfg.runtime.max_retries = 2;
        cfg.runtime.workflow_budget_secs = u64::MAX;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRuntime(_))));
    }
}
