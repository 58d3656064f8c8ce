//! Closed gap taxonomy: types, severities and the blocking rule.

use serde::{Deserialize, Serialize};

use crate::domain::digest::{digest_bytes, short};

/// Category of a detected deficiency.
///
/// Declaration order is the secondary sort key in reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    Requirements,
    Testing,
    Documentation,
    Security,
    Performance,
    CodeQuality,
    Deployment,
}

impl GapType {
    pub const ALL: [GapType; 7] = [
        GapType::Requirements,
        GapType::Testing,
        GapType::Documentation,
        GapType::Security,
        GapType::Performance,
        GapType::CodeQuality,
        GapType::Deployment,
    ];

    /// Short code used in gap identifiers.
    pub fn code(self) -> &'static str {
        match self {
            Self::Security => "SEC",
            Self::Deployment => "DEP",
            Self::Requirements => "REQ",
            Self::Testing => "TST",
            Self::Documentation => "DOC",
            Self::Performance => "PRF",
            Self::CodeQuality => "CQL",
        }
    }
}

impl std::fmt::Display for GapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Security => "security",
            Self::Deployment => "deployment",
            Self::Requirements => "requirements",
            Self::Testing => "testing",
            Self::Documentation => "documentation",
            Self::Performance => "performance",
            Self::CodeQuality => "code_quality",
        };
        f.write_str(s)
    }
}

/// Gap severity. Ordered so that `Critical` is the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// How strongly a heuristic indicates a deficiency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

/// Severity rule table keyed by (gap type, signal strength).
pub fn severity_for(gap_type: GapType, strength: SignalStrength) -> Severity {
    use SignalStrength::*;
    use Severity::*;
    match (gap_type, strength) {
        (GapType::Security, Weak) => Medium,
        (GapType::Security, Moderate) => High,
        (GapType::Security, Strong) => Critical,

        (GapType::Deployment, Weak) => Low,
        (GapType::Deployment, Moderate) => Medium,
        (GapType::Deployment, Strong) => High,

        (GapType::Requirements, Weak) => Low,
        (GapType::Requirements, Moderate) => Medium,
        (GapType::Requirements, Strong) => High,

        (GapType::Testing, Weak) => Low,
        (GapType::Testing, Moderate) => Medium,
        (GapType::Testing, Strong) => High,

        (GapType::Documentation, Weak) => Low,
        (GapType::Documentation, Moderate | Strong) => Medium,

        (GapType::Performance, Weak) => Low,
        (GapType::Performance, Moderate) => Medium,
        (GapType::Performance, Strong) => High,

        (GapType::CodeQuality, Weak | Moderate) => Low,
        (GapType::CodeQuality, Strong) => Medium,
    }
}

/// Blocking rule: any Critical gap, or a High gap on a release-critical type.
pub fn is_blocking(gap_type: GapType, severity: Severity) -> bool {
    match severity {
        Severity::Critical => true,
        Severity::High => matches!(gap_type, GapType::Security | GapType::Deployment),
        Severity::Medium | Severity::Low => false,
    }
}

/// A classified deficiency.
///
/// `blocking` always agrees with [`is_blocking`]: it is derived on
/// construction and again on deserialization, whatever the stored flag says.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "GapRecord")]
pub struct Gap {
    id: String,
    #[serde(rename = "type")]
    gap_type: GapType,
    severity: Severity,
    description: String,
    blocking: bool,
}

/// Wire shape of a [`Gap`] before the blocking rule is reapplied.
#[derive(Deserialize)]
struct GapRecord {
    id: String,
    #[serde(rename = "type")]
    gap_type: GapType,
    severity: Severity,
    description: String,
}

impl From<GapRecord> for Gap {
    fn from(record: GapRecord) -> Self {
        Self {
            blocking: is_blocking(record.gap_type, record.severity),
            id: record.id,
            gap_type: record.gap_type,
            severity: record.severity,
            description: record.description,
        }
    }
}

impl Gap {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gap_type(&self) -> GapType {
        self.gap_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn blocking(&self) -> bool {
        self.blocking
    }

    /// Build a gap with a content-derived identifier.
    pub fn new(gap_type: GapType, severity: Severity, description: impl Into<String>) -> Self {
        let description = description.into();
        let digest = digest_bytes(
            format!("{}|{}|{}", gap_type, severity, description).as_bytes(),
        );
        Self {
            id: format!("GAP-{}-{}", gap_type.code(), short(&digest, 8)),
            gap_type,
            severity,
            blocking: is_blocking(gap_type, severity),
            description,
        }
    }

    /// Build a gap whose severity comes from the rule table.
    pub fn from_signal(
        gap_type: GapType,
        strength: SignalStrength,
        description: impl Into<String>,
    ) -> Self {
        Self::new(gap_type, severity_for(gap_type, strength), description)
    }
}

/// Deterministic report order: severity descending, then type, then text.
pub fn sort_gaps(gaps: &mut [Gap]) {
    gaps.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.gap_type.cmp(&b.gap_type))
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_rule() {
        assert!(is_blocking(GapType::Testing, Severity::Critical));
        assert!(is_blocking(GapType::Security, Severity::High));
        assert!(is_blocking(GapType::Deployment, Severity::High));
        assert!(!is_blocking(GapType::Requirements, Severity::High));
        assert!(!is_blocking(GapType::Security, Severity::Medium));
    }

    #[test]
    fn test_severity_table_missing_auth_is_critical() {
        let gap = Gap::from_signal(
            GapType::Security,
            SignalStrength::Strong,
            "new endpoint POST /api/admin lacks an auth check",
        );
        assert_eq!(gap.severity, Severity::Critical);
        assert!(gap.blocking);
    }

    #[test]
    fn test_deserialized_blocking_follows_rule() {
        let critical: Gap = serde_json::from_str(
            r#"{"id":"GAP-SEC-1","type":"security","severity":"critical","description":"x","blocking":false}"#,
        )
        .unwrap();
        assert!(critical.blocking());

        let low: Gap = serde_json::from_str(
            r#"{"id":"GAP-TST-1","type":"testing","severity":"low","description":"y","blocking":true}"#,
        )
        .unwrap();
        assert!(!low.blocking());

        let gap = Gap::new(GapType::Deployment, Severity::High, "no rollback");
        let json = serde_json::to_value(&gap).unwrap();
        assert_eq!(json["type"], "deployment");
        assert_eq!(json["blocking"], true);
        let back: Gap = serde_json::from_value(json).unwrap();
        assert_eq!(back, gap);
    }

    #[test]
    fn test_severity_is_monotonic_in_strength() {
        for t in GapType::ALL {
            let weak = severity_for(t, SignalStrength::Weak);
            let moderate = severity_for(t, SignalStrength::Moderate);
            let strong = severity_for(t, SignalStrength::Strong);
            assert!(weak <= moderate && moderate <= strong, "{t}");
        }
    }

    #[test]
    fn test_gap_id_is_deterministic() {
        let a = Gap::new(GapType::Documentation, Severity::Medium, "no linked documentation");
        let b = Gap::new(GapType::Documentation, Severity::Medium, "no linked documentation");
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("GAP-DOC-"));
        let c = Gap::new(GapType::Documentation, Severity::Low, "no linked documentation");
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_sort_gaps_severity_then_type() {
        let mut gaps = vec![
            Gap::new(GapType::Documentation, Severity::Medium, "d"),
            Gap::new(GapType::Testing, Severity::High, "t"),
            Gap::new(GapType::Requirements, Severity::Medium, "r"),
            Gap::new(GapType::Security, Severity::Critical, "s"),
        ];
        sort_gaps(&mut gaps);
        let order: Vec<_> = gaps.iter().map(|g| g.gap_type).collect();
        assert_eq!(
            order,
            vec![
                GapType::Security,
                GapType::Testing,
                GapType::Requirements,
                GapType::Documentation
            ]
        );
    }
}
