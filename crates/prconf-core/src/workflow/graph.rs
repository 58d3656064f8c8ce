//! Workflow DAG and level-ordered execution planning.
//!
//! An edge `A -> B` means B depends on A. Levels are computed with Kahn's
//! algorithm: a node's level is one more than the deepest of its
//! dependencies, so every node on a level can start once the previous levels
//! have finished.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// A workflow node.
///
/// Declaration order is the tie-break for deterministic level ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    ExtractContext,
    FetchRequirements,
    FetchDocumentation,
    AnalyzeAlignment,
    AnalyzeConsistency,
    CrossReference,
    CollectSignals,
    DetectGaps,
    ScoreConfidence,
    GenerateRecommendations,
    BuildReport,
}

impl NodeId {
    pub const ALL: [NodeId; 11] = [
        NodeId::ExtractContext,
        NodeId::FetchRequirements,
        NodeId::FetchDocumentation,
        NodeId::AnalyzeAlignment,
        NodeId::AnalyzeConsistency,
        NodeId::CrossReference,
        NodeId::CollectSignals,
        NodeId::DetectGaps,
        NodeId::ScoreConfidence,
        NodeId::GenerateRecommendations,
        NodeId::BuildReport,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ExtractContext => "extract_context",
            Self::FetchRequirements => "fetch_requirements",
            Self::FetchDocumentation => "fetch_documentation",
            Self::AnalyzeAlignment => "analyze_alignment",
            Self::AnalyzeConsistency => "analyze_consistency",
            Self::CrossReference => "cross_reference",
            Self::CollectSignals => "collect_signals",
            Self::DetectGaps => "detect_gaps",
            Self::ScoreConfidence => "score_confidence",
            Self::GenerateRecommendations => "generate_recommendations",
            Self::BuildReport => "build_report",
        }
    }

    /// Required nodes abort the workflow on failure; the rest degrade.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::ExtractContext | Self::ScoreConfidence | Self::BuildReport
        )
    }

    /// Whether the node may run concurrently with its level siblings.
    pub fn is_parallelizable(self) -> bool {
        matches!(self, Self::FetchRequirements | Self::FetchDocumentation)
    }

    /// Dependencies of the standard pipeline.
    pub fn dependencies(self) -> &'static [NodeId] {
        use NodeId::*;
        match self {
            ExtractContext => &[],
            FetchRequirements | FetchDocumentation => &[ExtractContext],
            AnalyzeAlignment => &[ExtractContext, FetchRequirements],
            AnalyzeConsistency => &[ExtractContext, FetchDocumentation],
            CrossReference => &[AnalyzeAlignment, AnalyzeConsistency],
            CollectSignals => &[CrossReference],
            DetectGaps => &[CollectSignals],
            ScoreConfidence => &[DetectGaps],
            GenerateRecommendations => &[ScoreConfidence],
            BuildReport => &[GenerateRecommendations],
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated dependency graph with precomputed levels.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    upstream: BTreeMap<NodeId, Vec<NodeId>>,
    levels: Vec<Vec<NodeId>>,
}

impl WorkflowGraph {
    /// The confidence pipeline.
    pub fn standard() -> Result<Self> {
        Self::from_edges(
            NodeId::ALL
                .iter()
                .map(|n| (*n, n.dependencies().to_vec())),
        )
    }

    /// Build from `(node, dependencies)` pairs.
    ///
    /// Returns [`PipelineError::UnknownDependency`] when a dependency is not
    /// itself declared, and [`PipelineError::DependencyCycle`] when the edges
    /// do not form a DAG.
    pub fn from_edges<I>(edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, Vec<NodeId>)>,
    {
        let upstream: BTreeMap<NodeId, Vec<NodeId>> = edges.into_iter().collect();
        for (node, deps) in &upstream {
            if let Some(missing) = deps.iter().find(|d| !upstream.contains_key(*d)) {
                return Err(PipelineError::UnknownDependency {
                    node: node.to_string(),
                    dependency: missing.to_string(),
                });
            }
        }
        let levels = Self::compute_levels(&upstream)?;
        Ok(Self { upstream, levels })
    }

    fn compute_levels(upstream: &BTreeMap<NodeId, Vec<NodeId>>) -> Result<Vec<Vec<NodeId>>> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut downstream: HashMap<NodeId, BTreeSet<NodeId>> = HashMap::new();
        for (node, deps) in upstream {
            let unique: BTreeSet<NodeId> = deps.iter().copied().collect();
            in_degree.insert(*node, unique.len());
            for dep in unique {
                downstream.entry(dep).or_default().insert(*node);
            }
        }

        let mut frontier: VecDeque<NodeId> = upstream
            .keys()
            .filter(|n| in_degree.get(*n) == Some(&0))
            .copied()
            .collect();
        let mut levels = Vec::new();
        let mut placed = 0usize;

        while !frontier.is_empty() {
            let mut level: Vec<NodeId> = frontier.drain(..).collect();
            level.sort_unstable();
            let mut next = Vec::new();
            for node in &level {
                if let Some(dependents) = downstream.get(node) {
                    for dependent in dependents {
                        if let Some(deg) = in_degree.get_mut(dependent) {
                            *deg -= 1;
                            if *deg == 0 {
                                next.push(*dependent);
                            }
                        }
                    }
                }
            }
            placed += level.len();
            levels.push(level);
            next.sort_unstable();
            frontier.extend(next);
        }

        if placed != upstream.len() {
            let nodes = upstream
                .keys()
                .filter(|n| in_degree.get(*n).is_some_and(|d| *d > 0))
                .map(|n| n.to_string())
                .collect();
            return Err(PipelineError::DependencyCycle { nodes });
        }
        Ok(levels)
    }

    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.upstream.keys().copied()
    }

    pub fn dependencies(&self, node: NodeId) -> &[NodeId] {
        self.upstream.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn level_of(&self, node: NodeId) -> Option<usize> {
        self.levels.iter().position(|l| l.contains(&node))
    }

    /// Execution groups in order.
    ///
    /// Parallelizable nodes of a level form one group; every other node runs
    /// as a singleton group.
    pub fn execution_groups(&self) -> Vec<Vec<NodeId>> {
        let mut groups = Vec::new();
        for level in &self.levels {
            let (parallel, serial): (Vec<NodeId>, Vec<NodeId>) =
                level.iter().copied().partition(|n| n.is_parallelizable());
            if !parallel.is_empty() {
                groups.push(parallel);
            }
            groups.extend(serial.into_iter().map(|n| vec![n]));
        }
        groups
    }
}
