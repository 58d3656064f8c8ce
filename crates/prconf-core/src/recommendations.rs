//! Recommendation generation: one action item per root cause.

use std::collections::BTreeMap;

use crate::domain::gap::{Gap, GapType, Severity};
use crate::domain::report::{ActionItem, Effort, Priority};

fn priority_for(gap: &Gap) -> Priority {
    match gap.severity() {
        Severity::Critical => Priority::Immediate,
        Severity::High if gap.blocking() => Priority::Immediate,
        Severity::High | Severity::Medium => Priority::ShortTerm,
        Severity::Low => Priority::LongTerm,
    }
}

fn base_effort(gap_type: GapType) -> Effort {
    match gap_type {
        GapType::Documentation | GapType::CodeQuality => Effort::Small,
        GapType::Requirements | GapType::Testing | GapType::Deployment => Effort::Medium,
        GapType::Security | GapType::Performance => Effort::Large,
    }
}

fn effort_for(gap: &Gap) -> Effort {
    let effort = base_effort(gap.gap_type());
    if gap.severity() >= Severity::High {
        effort.bump()
    } else {
        effort
    }
}

fn action_for(gap: &Gap) -> String {
    let verb = match gap.gap_type() {
        GapType::Requirements => "Link or satisfy the missing requirement",
        GapType::Testing => "Add tests covering",
        GapType::Documentation => "Update the documentation for",
        GapType::Security => "Fix and security-review",
        GapType::Performance => "Benchmark and address",
        GapType::CodeQuality => "Refactor to resolve",
        GapType::Deployment => "Verify the rollout plan for",
    };
    format!("{verb}: {}", gap.description())
}

/// Dedup key: lowercase text with ticket ids and digits masked, punctuation
/// dropped and whitespace collapsed.
pub fn normalize_key(description: &str) -> String {
    let lowered = description.to_ascii_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut chars = lowered.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            while chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                chars.next();
            }
            out.push('#');
        } else if c.is_alphanumeric() || c.is_whitespace() {
            out.push(c);
        } else if c == '-' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            // ticket ids: "app-12" and "app-7" share a key
        } else {
            out.push(' ');
        }
    }
    let collapsed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    mask_ticket_prefixes(&collapsed)
}

/// "app#" -> "#", so different projects' tickets also share a key.
fn mask_ticket_prefixes(text: &str) -> String {
    text.split(' ')
        .map(|w| {
            if w.len() > 1
                && w.ends_with('#')
                && w[..w.len() - 1].chars().all(|c| c.is_ascii_alphabetic())
            {
                "#"
            } else {
                w
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map gaps to deduplicated action items, most urgent first.
///
/// Gaps are expected in report order; the first gap of each root cause
/// determines the item's wording, and urgency/effort take the maximum.
pub fn generate_recommendations(gaps: &[Gap]) -> Vec<ActionItem> {
    let mut grouped: BTreeMap<(GapType, String), ActionItem> = BTreeMap::new();
    for gap in gaps {
        let key = (gap.gap_type(), normalize_key(gap.description()));
        let priority = priority_for(gap);
        let effort = effort_for(gap);
        grouped
            .entry(key)
            .and_modify(|item| {
                item.priority = item.priority.min(priority);
                item.effort = item.effort.max(effort);
                item.gap_ids.push(gap.id().to_string());
            })
            .or_insert_with(|| ActionItem {
                gap_type: gap.gap_type(),
                priority,
                effort,
                action: action_for(gap),
                gap_ids: vec![gap.id().to_string()],
            });
    }
    let mut items: Vec<ActionItem> = grouped.into_values().collect();
    items.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.gap_type.cmp(&b.gap_type))
            .then_with(|| a.action.cmp(&b.action))
    });
    items
}
