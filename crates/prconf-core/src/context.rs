//! Context extraction: trigger payload to [`PrContext`].

use std::collections::HashSet;

use crate::config::{ImpactThresholds, PathMatcher};
use crate::domain::error::ValidationError;
use crate::domain::pr::{ChangeMetrics, ImpactScope, PrContext, TriggerEvent};

const REQUIRED_FIELDS: [&str; 4] = ["repository", "prId", "title", "author"];

/// Validate a raw JSON payload and extract the context.
///
/// Absent required keys are reported as [`ValidationError::MissingField`]
/// rather than a generic parse failure.
pub fn extract_from_value(
    value: serde_json::Value,
    impact: &ImpactThresholds,
    paths: &PathMatcher,
) -> Result<PrContext, ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::Malformed("payload is not a JSON object".to_string()))?;
    for field in REQUIRED_FIELDS {
        if obj.get(field).map_or(true, |v| v.is_null()) {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }
    }
    let event = TriggerEvent::from_value(value)?;
    extract_context(&event, impact, paths)
}

/// Normalize a trigger event into an immutable context.
///
/// An empty diff is valid and classifies as [`ImpactScope::Trivial`].
pub fn extract_context(
    event: &TriggerEvent,
    impact: &ImpactThresholds,
    paths: &PathMatcher,
) -> Result<PrContext, ValidationError> {
    let repository = required("repository", &event.repository)?;
    let pr_id = required("prId", &event.pr_id)?;
    let title = required("title", &event.title)?;
    let author = required("author", &event.author)?;

    for (index, fc) in event.file_changes.iter().enumerate() {
        if fc.path.trim().is_empty() {
            return Err(ValidationError::EmptyFilePath { index });
        }
    }

    let metrics = compute_metrics(event, paths);
    let mut scope = impact.classify(metrics.lines_changed(), metrics.files_touched);
    if metrics.security_sensitive {
        scope = scope.max(ImpactScope::Moderate);
    }

    let mut seen = HashSet::new();
    let refs = event
        .linked_requirement_refs
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty() && seen.insert(r.to_ascii_uppercase()))
        .map(str::to_string)
        .collect();

    Ok(PrContext::new(
        repository,
        pr_id,
        title,
        event.description.trim().to_string(),
        author,
        event.file_changes.clone(),
        refs,
        scope,
        metrics,
    ))
}

fn required(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField {
            field: field.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn compute_metrics(event: &TriggerEvent, paths: &PathMatcher) -> ChangeMetrics {
    let mut metrics = ChangeMetrics::default();
    let mut distinct = HashSet::new();
    for fc in &event.file_changes {
        metrics.lines_added += u64::from(fc.additions);
        metrics.lines_removed += u64::from(fc.deletions);
        distinct.insert(fc.path.as_str());

        let candidates = std::iter::once(fc.path.as_str()).chain(fc.previous_path.as_deref());
        let mut security = false;
        let mut test = false;
        let mut deploy = false;
        for path in candidates {
            security |= paths.is_security_sensitive(path);
            test |= paths.is_test(path);
            deploy |= paths.is_deployment(path);
        }
        // Test fixtures under an auth directory are still tests.
        if security && !test {
            metrics.security_sensitive = true;
            metrics.security_paths.push(fc.path.clone());
        }
        if test {
            metrics.test_files_touched += 1;
        }
        metrics.deployment_sensitive |= deploy;
    }
    metrics.files_touched = distinct.len();
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::domain::pr::FileChange;
    use serde_json::json;

    fn event(files: Vec<FileChange>) -> TriggerEvent {
        TriggerEvent {
            repository: "org/app".to_string(),
            pr_id: "12".to_string(),
            title: "Tweak copy".to_string(),
            description: String::new(),
            file_changes: files,
            author: "dev".to_string(),
            linked_requirement_refs: Vec::new(),
        }
    }

    fn extract(ev: &TriggerEvent) -> Result<PrContext, ValidationError> {
        let cfg = PipelineConfig::default();
        let matcher = cfg.paths.compile().unwrap();
        extract_context(ev, &cfg.impact, &matcher)
    }

    #[test]
    fn test_single_small_file_is_trivial() {
        let ctx = extract(&event(vec![FileChange::new("src/lib.rs", 5, 2)])).unwrap();
        assert_eq!(ctx.impact_scope(), ImpactScope::Trivial);
        assert_eq!(ctx.change_metrics().lines_changed(), 7);
        assert_eq!(ctx.change_metrics().files_touched, 1);
        assert!(!ctx.change_metrics().security_sensitive);
    }

    #[test]
    fn test_empty_diff_is_trivial() {
        let ctx = extract(&event(Vec::new())).unwrap();
        assert_eq!(ctx.impact_scope(), ImpactScope::Trivial);
        assert_eq!(ctx.change_metrics().files_touched, 0);
    }

    #[test]
    fn test_security_path_raises_scope() {
        let ctx = extract(&event(vec![FileChange::new("src/auth/session.rs", 3, 0)])).unwrap();
        assert_eq!(ctx.impact_scope(), ImpactScope::Moderate);
        assert_eq!(
            ctx.change_metrics().security_paths,
            vec!["src/auth/session.rs".to_string()]
        );
    }

    #[test]
    fn test_test_files_counted_not_security() {
        let ctx = extract(&event(vec![FileChange::new("tests/auth_flow.rs", 40, 0)])).unwrap();
        assert_eq!(ctx.change_metrics().test_files_touched, 1);
        assert!(!ctx.change_metrics().security_sensitive);
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut ev = event(Vec::new());
        ev.title = "   ".to_string();
        assert_eq!(
            extract(&ev).unwrap_err(),
            ValidationError::EmptyField {
                field: "title".to_string()
            }
        );
    }

    #[test]
    fn test_empty_file_path_rejected() {
        let ev = event(vec![FileChange::new("src/a.rs", 1, 0), FileChange::new("", 1, 0)]);
        assert_eq!(
            extract(&ev).unwrap_err(),
            ValidationError::EmptyFilePath { index: 1 }
        );
    }

    #[test]
    fn test_missing_field_from_value() {
        let cfg = PipelineConfig::default();
        let matcher = cfg.paths.compile().unwrap();
        let err = extract_from_value(
            json!({"repository": "org/app", "title": "x", "author": "dev"}),
            &cfg.impact,
            &matcher,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "prId".to_string()
            }
        );
    }

    #[test]
    fn test_linked_refs_deduplicated() {
        let mut ev = event(Vec::new());
        ev.linked_requirement_refs = vec!["APP-1".into(), " app-1 ".into(), "".into(), "APP-2".into()];
        let ctx = extract(&ev).unwrap();
        assert_eq!(ctx.linked_requirement_refs(), ["APP-1", "APP-2"]);
    }
}
