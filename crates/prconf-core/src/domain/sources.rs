//! Collaborator-supplied evidence: requirements, documentation, quality signals.

use serde::{Deserialize, Serialize};

use crate::domain::digest::digest_json;
use crate::domain::error::FetchError;
use crate::domain::gap::{GapType, SignalStrength};

/// Requirement priority as reported by the tracker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A linked requirement ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub ticket_id: String,
    pub title: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub priority: RequirementPriority,
}

impl Requirement {
    pub fn new(ticket_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            title: title.into(),
            acceptance_criteria: Vec::new(),
            priority: RequirementPriority::Medium,
        }
    }

    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    /// Title and acceptance criteria joined for identifier extraction.
    pub fn text(&self) -> String {
        let mut out = self.title.clone();
        for c in &self.acceptance_criteria {
            out.push('\n');
            out.push_str(c);
        }
        out
    }
}

/// Requirements fetched for a pull request, plus any fetch failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSet {
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub fetch_errors: Vec<FetchError>,
}

impl RequirementSet {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self {
            requirements,
            fetch_errors: Vec::new(),
        }
    }

    /// Empty set carrying a single fetch-error marker.
    pub fn failed(error: FetchError) -> Self {
        Self {
            requirements: Vec::new(),
            fetch_errors: vec![error],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn digest(&self) -> String {
        digest_json(self).unwrap_or_default()
    }
}

/// A documentation page linked to (or discovered for) the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocRef {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub version: String,
}

impl DocRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            doc_type: "reference".to_string(),
            content: content.into(),
            version: "1".to_string(),
        }
    }
}

/// Documentation fetched for a pull request, plus any fetch failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationSet {
    pub docs: Vec<DocRef>,
    #[serde(default)]
    pub fetch_errors: Vec<FetchError>,
}

impl DocumentationSet {
    pub fn new(docs: Vec<DocRef>) -> Self {
        Self {
            docs,
            fetch_errors: Vec::new(),
        }
    }

    pub fn failed(error: FetchError) -> Self {
        Self {
            docs: Vec::new(),
            fetch_errors: vec![error],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn digest(&self) -> String {
        digest_json(self).unwrap_or_default()
    }
}

/// A heuristic finding raised by an external analysis tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalFinding {
    pub gap_type: GapType,
    pub strength: SignalStrength,
    pub description: String,
}

/// Heuristic quality signals supplied by a collaborator.
///
/// Absent component values default to the neutral 0.5 at scoring time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySignals {
    #[serde(default)]
    pub test_coverage: Option<f64>,
    #[serde(default)]
    pub code_quality: Option<f64>,
    #[serde(default)]
    pub security_assessment: Option<f64>,
    #[serde(default)]
    pub findings: Vec<SignalFinding>,
}
