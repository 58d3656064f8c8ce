//! Per-run workflow state machine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ErrorKind, PipelineError, Result};
use crate::workflow::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Pending -> Running -> {Succeeded, Failed, Skipped}. A node that never
    /// started may also be skipped directly.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Skipped)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Skipped)
        )
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Created,
    Running,
    Completed,
    Failed,
    PartiallyCompleted,
}

impl OverallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::PartiallyCompleted
        )
    }

    pub fn can_transition_to(self, next: OverallStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::PartiallyCompleted)
        )
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::PartiallyCompleted => "partially_completed",
        };
        f.write_str(s)
    }
}

/// One `errorLog` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub node: Option<NodeId>,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Status of one workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    run_id: String,
    status: OverallStatus,
    nodes: BTreeMap<NodeId, NodeStatus>,
    retries: BTreeMap<NodeId, u32>,
    error_log: Vec<ErrorEntry>,
}

impl WorkflowState {
    /// A fresh `Created` state with every node `Pending`.
    pub fn new(run_id: impl Into<String>, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            run_id: run_id.into(),
            status: OverallStatus::Created,
            nodes: nodes.into_iter().map(|n| (n, NodeStatus::Pending)).collect(),
            retries: BTreeMap::new(),
            error_log: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> OverallStatus {
        self.status
    }

    pub fn node_status(&self, node: NodeId) -> Option<NodeStatus> {
        self.nodes.get(&node).copied()
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, NodeStatus> {
        &self.nodes
    }

    pub fn retries(&self, node: NodeId) -> u32 {
        self.retries.get(&node).copied().unwrap_or(0)
    }

    pub fn error_log(&self) -> &[ErrorEntry] {
        &self.error_log
    }

    pub fn errors_of_kind(&self, kind: ErrorKind) -> usize {
        self.error_log.iter().filter(|e| e.kind == kind).count()
    }

    /// Move the whole run to `next`.
    pub fn set_status(&mut self, next: OverallStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                node: "workflow".to_string(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Move one node to `next`.
    pub fn transition(&mut self, node: NodeId, next: NodeStatus) -> Result<()> {
        let current = self.nodes.get(&node).copied().ok_or_else(|| {
            PipelineError::InvalidTransition {
                node: node.to_string(),
                from: "unregistered".to_string(),
                to: next.to_string(),
            }
        })?;
        if !current.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                node: node.to_string(),
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        self.nodes.insert(node, next);
        Ok(())
    }

    /// Skip every node that has not started yet.
    pub fn skip_pending(&mut self) {
        for status in self.nodes.values_mut() {
            if *status == NodeStatus::Pending {
                *status = NodeStatus::Skipped;
            }
        }
    }

    pub fn add_retries(&mut self, node: NodeId, count: u32) {
        if count > 0 {
            *self.retries.entry(node).or_default() += count;
        }
    }

    pub fn log_error(&mut self, kind: ErrorKind, node: Option<NodeId>, message: impl Into<String>) {
        self.error_log.push(ErrorEntry {
            kind,
            node,
            message: message.into(),
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkflowState {
        WorkflowState::new("run-1", NodeId::ALL)
    }

    #[test]
    fn test_node_lifecycle() {
        let mut s = state();
        s.transition(NodeId::ExtractContext, NodeStatus::Running).unwrap();
        s.transition(NodeId::ExtractContext, NodeStatus::Succeeded).unwrap();
        assert_eq!(
            s.node_status(NodeId::ExtractContext),
            Some(NodeStatus::Succeeded)
        );
    }

    #[test]
    fn test_invalid_node_transition() {
        let mut s = state();
        let err = s
            .transition(NodeId::BuildReport, NodeStatus::Succeeded)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));

        s.transition(NodeId::BuildReport, NodeStatus::Running).unwrap();
        s.transition(NodeId::BuildReport, NodeStatus::Failed).unwrap();
        assert!(s.transition(NodeId::BuildReport, NodeStatus::Running).is_err());
    }

    #[test]
    fn test_overall_lifecycle() {
        let mut s = state();
        assert_eq!(s.status(), OverallStatus::Created);
        assert!(s.set_status(OverallStatus::Completed).is_err());
        s.set_status(OverallStatus::Running).unwrap();
        s.set_status(OverallStatus::PartiallyCompleted).unwrap();
        assert!(s.status().is_terminal());
        assert!(s.set_status(OverallStatus::Running).is_err());
    }

    #[test]
    fn test_skip_pending_leaves_finished_nodes() {
        let mut s = state();
        s.transition(NodeId::ExtractContext, NodeStatus::Running).unwrap();
        s.transition(NodeId::ExtractContext, NodeStatus::Succeeded).unwrap();
        s.skip_pending();
        assert_eq!(
            s.node_status(NodeId::ExtractContext),
            Some(NodeStatus::Succeeded)
        );
        assert!(s
            .nodes()
            .iter()
            .filter(|(n, _)| **n != NodeId::ExtractContext)
            .all(|(_, st)| *st == NodeStatus::Skipped));
    }

    #[test]
    fn test_error_log_and_retries() {
        let mut s = state();
        s.log_error(ErrorKind::Fetch, Some(NodeId::FetchRequirements), "timed out");
        s.add_retries(NodeId::FetchRequirements, 2);
        s.add_retries(NodeId::FetchRequirements, 0);
        assert_eq!(s.errors_of_kind(ErrorKind::Fetch), 1);
        assert_eq!(s.retries(NodeId::FetchRequirements), 2);
        assert_eq!(s.retries(NodeId::AnalyzeAlignment), 0);

        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["nodes"]["fetch_requirements"], "pending");
        assert_eq!(json["error_log"][0]["kind"], "fetch");
    }
}
