//! Workflow engine: DAG planning, per-run state, retries and execution.

pub mod engine;
pub mod graph;
pub mod retry;
pub mod run_context;
pub mod state;

pub use engine::{EngineBuilder, Trigger, WorkflowEngine, WorkflowOutcome};
pub use graph::{NodeId, WorkflowGraph};
pub use retry::{retry_transient, Attempted, RetryPolicy};
pub use run_context::{MemoKey, RunContext, ScoreMemo};
pub use state::{ErrorEntry, NodeStatus, OverallStatus, WorkflowState};
