//! Cross-reference analysis: weighted percentages and cross-source gaps.
//!
//! Identifiers (ticket ids, endpoints) are extracted from the change and from
//! the requirement and documentation text, and compared as sets.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::WeightsConfig;
use crate::domain::analysis::{AlignmentResult, ConsistencyResult, CrossReferenceResult};
use crate::domain::gap::{Gap, GapType, SignalStrength};
use crate::domain::pr::PrContext;
use crate::domain::sources::{DocumentationSet, RequirementSet};

const TICKET_PATTERN: &str = r"\b[A-Z][A-Z0-9]+-\d+\b";
const ENDPOINT_PATTERN: &str =
    r#"(?:^|[\s`'"(])(/(?:api|v\d+)(?:/[A-Za-z0-9_\-{}:.]+)+)"#;
const ROUTE_PATTERN: &str =
    r"\b(?:GET|POST|PUT|PATCH|DELETE)\s+(/[A-Za-z0-9_\-{}:./]*)";

fn ticket_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TICKET_PATTERN).ok()).as_ref()
}

fn endpoint_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [ENDPOINT_PATTERN, ROUTE_PATTERN]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Ticket ids such as `APP-142`.
pub fn extract_tickets(text: &str) -> BTreeSet<String> {
    let Some(re) = ticket_re() else {
        return BTreeSet::new();
    };
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// API paths such as `/api/users/{id}`, normalized (lowercase, no trailing
/// slash or punctuation).
pub fn extract_endpoints(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for re in endpoint_res() {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                let normalized = normalize_endpoint(m.as_str());
                if normalized.len() > 1 {
                    out.insert(normalized);
                }
            }
        }
    }
    out
}

fn normalize_endpoint(raw: &str) -> String {
    raw.trim_end_matches(['.', ',', ':', ';', '/'])
        .to_ascii_lowercase()
}

/// Identifiers introduced, removed and mentioned by the change.
#[derive(Debug, Default)]
struct ChangeIdentifiers {
    tickets: BTreeSet<String>,
    added_endpoints: BTreeSet<String>,
    removed_endpoints: BTreeSet<String>,
}

fn change_identifiers(ctx: &PrContext) -> ChangeIdentifiers {
    let mut ids = ChangeIdentifiers::default();
    let header = format!("{}\n{}", ctx.title(), ctx.description());
    ids.tickets.extend(extract_tickets(&header));
    ids.tickets
        .extend(ctx.linked_requirement_refs().iter().map(|r| r.to_ascii_uppercase()));
    ids.added_endpoints.extend(extract_endpoints(&header));

    for fc in ctx.file_changes() {
        for line in fc.added_lines() {
            ids.tickets.extend(extract_tickets(line));
            ids.added_endpoints.extend(extract_endpoints(line));
        }
        for line in fc.removed_lines() {
            ids.removed_endpoints.extend(extract_endpoints(line));
        }
    }
    // Moved or edited routes are not removals.
    let still_present = ids.added_endpoints.clone();
    ids.removed_endpoints.retain(|e| !still_present.contains(e));
    ids
}

/// Weighted mean of alignment dimensions, in percent.
pub fn alignment_pct(alignment: &AlignmentResult, weights: &WeightsConfig) -> f64 {
    100.0
        * alignment
            .iter()
            .map(|(d, v)| v * weights.alignment.get(d))
            .sum::<f64>()
}

/// Weighted mean of consistency dimensions, in percent.
pub fn consistency_pct(consistency: &ConsistencyResult, weights: &WeightsConfig) -> f64 {
    100.0
        * consistency
            .iter()
            .map(|(d, v)| v * weights.consistency.get(d))
            .sum::<f64>()
}

/// Merge both analyses and detect identifier mismatches across sources.
pub fn cross_reference(
    ctx: &PrContext,
    requirements: &RequirementSet,
    docs: &DocumentationSet,
    alignment: &AlignmentResult,
    consistency: &ConsistencyResult,
    weights: &WeightsConfig,
) -> CrossReferenceResult {
    let change = change_identifiers(ctx);
    let mut gaps = Vec::new();

    let mut requirement_tickets = BTreeSet::new();
    for req in &requirements.requirements {
        requirement_tickets.insert(req.ticket_id.to_ascii_uppercase());
        requirement_tickets.extend(extract_tickets(&req.text()));

        for endpoint in extract_endpoints(&req.text()) {
            if !change.added_endpoints.contains(&endpoint) {
                gaps.push(Gap::from_signal(
                    GapType::Requirements,
                    SignalStrength::Moderate,
                    format!(
                        "requirement {} references endpoint {} not present in the change",
                        req.ticket_id, endpoint
                    ),
                ));
            }
        }
    }

    if !requirements.is_empty() {
        for ticket in change.tickets.difference(&requirement_tickets) {
            gaps.push(Gap::from_signal(
                GapType::Requirements,
                SignalStrength::Weak,
                format!("change references ticket {ticket} with no matching requirement"),
            ));
        }
    }

    let mut documented = BTreeSet::new();
    for doc in &docs.docs {
        let endpoints = extract_endpoints(&format!("{}\n{}", doc.title, doc.content));
        for endpoint in endpoints.intersection(&change.removed_endpoints) {
            gaps.push(Gap::from_signal(
                GapType::Documentation,
                SignalStrength::Strong,
                format!(
                    "document {} still describes endpoint {} removed by the change",
                    doc.id, endpoint
                ),
            ));
        }
        documented.extend(endpoints);
    }

    if !docs.is_empty() {
        for endpoint in change.added_endpoints.difference(&documented) {
            gaps.push(Gap::from_signal(
                GapType::Documentation,
                SignalStrength::Weak,
                format!("endpoint {endpoint} introduced by the change is undocumented"),
            ));
        }
    }

    CrossReferenceResult {
        alignment_pct: alignment_pct(alignment, weights),
        consistency_pct: consistency_pct(consistency, weights),
        cross_gaps: gaps,
    }
}

/// Percentages only, used when the cross-reference node falls back.
pub fn percentages_only(
    alignment: &AlignmentResult,
    consistency: &ConsistencyResult,
    weights: &WeightsConfig,
) -> CrossReferenceResult {
    CrossReferenceResult {
        alignment_pct: alignment_pct(alignment, weights),
        consistency_pct: consistency_pct(consistency, weights),
        cross_gaps: Vec::new(),
    }
}
