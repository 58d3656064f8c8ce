//! Per-run context passed through every node call.
//!
//! Holds everything scoped to one workflow instance: the run id, the
//! cancellation token, the wall-clock deadline and the scorer memo. Nothing
//! here is shared between runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collab::AnalysisKind;

/// Deadline used when `started + budget` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Memo key: (context digest, evidence-set digest, analysis kind).
pub type MemoKey = (String, String, AnalysisKind);

/// Scorer responses cached for the lifetime of a single run.
#[derive(Debug, Default)]
pub struct ScoreMemo {
    entries: Mutex<HashMap<MemoKey, BTreeMap<String, f64>>>,
}

impl ScoreMemo {
    pub fn get(&self, key: &MemoKey) -> Option<BTreeMap<String, f64>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: MemoKey, scores: BTreeMap<String, f64>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, scores);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    cancel: CancellationToken,
    started: Instant,
    deadline: Instant,
    memo: ScoreMemo,
}

impl RunContext {
    pub fn new(budget: Duration, cancel: CancellationToken) -> Self {
        let started = Instant::now();
        let deadline = started
            .checked_add(budget)
            .or_else(|| started.checked_add(FAR_FUTURE))
            .unwrap_or(started);
        Self {
            run_id: Uuid::new_v4().to_string(),
            cancel,
            started,
            deadline,
            memo: ScoreMemo::default(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn deadline_passed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn memo(&self) -> &ScoreMemo {
        &self.memo
    }
}
