//! Pull-request trigger payload and the normalized review context.

use serde::{Deserialize, Serialize};

use crate::domain::digest::digest_json;
use crate::domain::error::ValidationError;

/// How a file was changed by the pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl Default for ChangeStatus {
    fn default() -> Self {
        Self::Modified
    }
}

/// Diff metadata for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub path: String,
    #[serde(default)]
    pub status: ChangeStatus,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    /// Unified diff text, when the event source provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, additions: u32, deletions: u32) -> Self {
        Self {
            path: path.into(),
            status: ChangeStatus::Modified,
            additions,
            deletions,
            patch: None,
            previous_path: None,
        }
    }

    pub fn with_status(mut self, status: ChangeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = Some(patch.into());
        self
    }

    /// Lines introduced by the patch (`+` lines, excluding the `+++` header).
    pub fn added_lines(&self) -> impl Iterator<Item = &str> {
        self.patch_lines('+', "+++")
    }

    /// Lines deleted by the patch (`-` lines, excluding the `---` header).
    pub fn removed_lines(&self) -> impl Iterator<Item = &str> {
        self.patch_lines('-', "---")
    }

    fn patch_lines<'a>(
        &'a self,
        marker: char,
        header: &'static str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.patch
            .as_deref()
            .unwrap_or_default()
            .lines()
            .filter(move |l| l.starts_with(marker) && !l.starts_with(header))
            .map(|l| &l[1..])
    }
}

/// Raw trigger received from the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub repository: String,
    pub pr_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_changes: Vec<FileChange>,
    pub author: String,
    #[serde(default)]
    pub linked_requirement_refs: Vec<String>,
}

impl TriggerEvent {
    /// Parse a trigger payload. Missing or mistyped fields surface as
    /// [`ValidationError::Malformed`].
    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(raw).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Parse from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

/// Coarse size/risk classification of a change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ImpactScope {
    Trivial,
    Minor,
    Moderate,
    Major,
}

impl std::fmt::Display for ImpactScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trivial => write!(f, "trivial"),
            Self::Minor => write!(f, "minor"),
            Self::Moderate => write!(f, "moderate"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// Aggregate diff statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMetrics {
    pub lines_added: u64,
    pub lines_removed: u64,
    pub files_touched: usize,
    pub security_sensitive: bool,
    /// Paths that matched a security-sensitive glob, in diff order.
    pub security_paths: Vec<String>,
    pub test_files_touched: usize,
    pub deployment_sensitive: bool,
}

impl ChangeMetrics {
    pub fn lines_changed(&self) -> u64 {
        self.lines_added + self.lines_removed
    }
}

/// Normalized, immutable view of a pull request under review.
///
/// Only the context extractor constructs this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrContext {
    repository: String,
    id: String,
    title: String,
    description: String,
    author: String,
    file_changes: Vec<FileChange>,
    linked_requirement_refs: Vec<String>,
    impact_scope: ImpactScope,
    change_metrics: ChangeMetrics,
}

impl PrContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        repository: String,
        id: String,
        title: String,
        description: String,
        author: String,
        file_changes: Vec<FileChange>,
        linked_requirement_refs: Vec<String>,
        impact_scope: ImpactScope,
        change_metrics: ChangeMetrics,
    ) -> Self {
        Self {
            repository,
            id,
            title,
            description,
            author,
            file_changes,
            linked_requirement_refs,
            impact_scope,
            change_metrics,
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn file_changes(&self) -> &[FileChange] {
        &self.file_changes
    }

    pub fn linked_requirement_refs(&self) -> &[String] {
        &self.linked_requirement_refs
    }

    pub fn impact_scope(&self) -> ImpactScope {
        self.impact_scope
    }

    pub fn change_metrics(&self) -> &ChangeMetrics {
        &self.change_metrics
    }

    /// Stable content digest, used as a memoization key.
    pub fn digest(&self) -> String {
        // Plain strings and integers only; serialization cannot fail.
        digest_json(self).unwrap_or_default()
    }

    /// Title, description and patch text concatenated for lexical analysis.
    pub fn searchable_text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.title, self.description);
        for fc in &self.file_changes {
            out.push_str(&fc.path);
            out.push('\n');
            if let Some(patch) = &fc.patch {
                out.push_str(patch);
                out.push('\n');
            }
        }
        out
    }
}
