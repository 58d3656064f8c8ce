//! Side-effect-free projections of a [`ConfidenceReport`].

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::report::ConfidenceReport;

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &ConfidenceReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize confidence report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a markdown summary suitable for a PR comment.
pub fn render_markdown(report: &ConfidenceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# PR Confidence: {} #{}\n\n",
        report.repository(),
        report.pr_id()
    ));
    out.push_str(&format!(
        "- score: **{}** / 100 ({})\n- recommendation: **{}**\n- penalty factor: {:.3}\n",
        report.score(),
        report.level(),
        report.recommendation(),
        report.penalty_factor()
    ));
    out.push_str(&format!(
        "- alignment: {:.1}%\n- consistency: {:.1}%\n",
        report.alignment_pct(),
        report.consistency_pct()
    ));
    if report.degraded() {
        out.push_str("- **degraded**: some inputs fell back to default values\n");
    }
    out.push('\n');

    out.push_str("## Components\n\n| component | score |\n|---|---|\n");
    for (component, value) in report.component_scores() {
        out.push_str(&format!("| {} | {:.2} |\n", component.label(), value));
    }
    out.push('\n');

    if !report.critical_concerns().is_empty() {
        out.push_str("## Critical Concerns\n");
        for concern in report.critical_concerns() {
            out.push_str(&format!("- {}\n", concern));
        }
        out.push('\n');
    }

    out.push_str("## Gaps\n");
    if report.gaps().is_empty() {
        out.push_str("- none\n");
    }
    for gap in report.gaps() {
        let marker = if gap.blocking() { " (blocking)" } else { "" };
        out.push_str(&format!(
            "- `{}` {}/{}{}: {}\n",
            gap.id(), gap.gap_type(), gap.severity(), marker, gap.description()
        ));
    }
    out.push('\n');

    if !report.recommendations().is_empty() {
        out.push_str("## Recommendations\n");
        for item in report.recommendations() {
            out.push_str(&format!(
                "- [{}, {} effort] {}\n",
                item.priority, item.effort, item.action
            ));
        }
        out.push('\n');
    }

    if !report.strengths().is_empty() {
        out.push_str("## Strengths\n");
        for s in report.strengths() {
            out.push_str(&format!("- {}\n", s));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "_schema {} · generated {}_\n",
        report.schema_version(),
        report.generated_at().to_rfc3339()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gap::{Gap, GapType, Severity};
    use crate::domain::report::{
        ActionItem, Component, ConfidenceLevel, Effort, Priority, Recommendation, ReportParts,
    };
    use chrono::{DateTime, Utc};

    fn report(degraded: bool) -> ConfidenceReport {
        let gap = Gap::new(GapType::Security, Severity::Critical, "missing auth on POST /api/admin");
        ConfidenceReport::from_parts(ReportParts {
            repository: "org/app".to_string(),
            pr_id: "42".to_string(),
            score: 90,
            level: ConfidenceLevel::Excellent,
            recommendation: Recommendation::Hold,
            component_scores: Component::ALL.iter().map(|c| (*c, 1.0)).collect(),
            alignment_pct: 100.0,
            consistency_pct: 100.0,
            penalty_factor: 0.9,
            recommendations: vec![ActionItem {
                gap_type: GapType::Security,
                priority: Priority::Immediate,
                effort: Effort::Large,
                action: "Fix and security-review: missing auth".to_string(),
                gap_ids: vec![gap.id().to_string()],
            }],
            critical_concerns: vec![gap.description().to_string()],
            gaps: vec![gap],
            strengths: vec!["strong test coverage (1.00)".to_string()],
            degraded,
            generated_at: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("parse RFC3339")
                .with_timezone(&Utc),
        })
    }

    #[test]
    fn test_markdown_sections() {
        let md = render_markdown(&report(false));
        assert!(md.starts_with("# PR Confidence: org/app #42"));
        assert!(md.contains("score: **90** / 100 (excellent)"));
        assert!(md.contains("recommendation: **hold**"));
        assert!(md.contains("## Critical Concerns"));
        assert!(md.contains("security/critical (blocking)"));
        assert!(md.contains("[immediate, large effort]"));
        assert!(!md.contains("degraded"));
    }

    #[test]
    fn test_markdown_flags_degraded() {
        assert!(render_markdown(&report(true)).contains("**degraded**"));
    }

    #[test]
    fn test_rendering_is_pure() {
        let r = report(false);
        assert_eq!(render_markdown(&r), render_markdown(&r));
    }

    #[test]
    fn test_write_report_json() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("report.json");
        write_report_json(&path, &report(false)).expect("write");
        let raw = std::fs::read_to_string(&path).expect("read");
        let v: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(v["schema_version"], "1.0");
        assert_eq!(v["score"], 90);
        assert_eq!(v["gaps"][0]["type"], "security");
    }
}
