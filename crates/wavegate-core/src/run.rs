//! Run-level results handed to reporting collaborators.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointOutcome, CheckpointResult};
use crate::collision::CollisionResult;
use crate::events::RunEvent;
use crate::task::{TaskId, TaskStatus};
use crate::wave::ExecutionMode;

/// Outcome of a single task in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Task identifier
    pub task_id: TaskId,
    /// Worker that was (or would have been) invoked
    pub worker_id: String,
    /// Wave the task belongs to
    pub wave_index: usize,
    /// Final status: completed, failed, or blocked
    pub status: TaskStatus,
    /// Worker output summary on success
    pub output: Option<String>,
    /// Error detail on failure
    pub error: Option<String>,
    /// Wall-clock duration of the invocation in milliseconds
    pub duration_ms: u64,
}

impl TaskOutcome {
    /// Outcome for a task that never started because the run halted.
    pub fn blocked(task_id: TaskId, worker_id: String, wave_index: usize) -> Self {
        Self {
            task_id,
            worker_id,
            wave_index,
            status: TaskStatus::Blocked,
            output: None,
            error: None,
            duration_ms: 0,
        }
    }

    /// Whether the worker finished successfully.
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Summary of one executed wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSummary {
    /// Wave index
    pub index: usize,
    /// Tasks in input order
    pub task_ids: Vec<TaskId>,
    /// Whether the wave asked to run in parallel
    pub declared_parallel: bool,
    /// Mode the wave actually ran in
    pub mode: ExecutionMode,
    /// Collision analysis, when one was performed
    pub collision: Option<CollisionResult>,
    /// Whether the collision policy downgraded the wave to serial
    pub serialized_by_policy: bool,
    /// Checkpoint result, when the wave declared one
    pub checkpoint: Option<CheckpointResult>,
    /// Decision taken after the wave
    pub outcome: CheckpointOutcome,
    /// Wall-clock duration in milliseconds (tasks and checkpoint)
    pub duration_ms: u64,
}

impl WaveSummary {
    /// Number of tasks in the wave.
    pub fn task_count(&self) -> usize {
        self.task_ids.len()
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Every wave ran and no blocking checkpoint failed
    Completed,
    /// A blocking checkpoint failed
    Halted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => formatter.write_str("COMPLETED"),
            Self::Halted => formatter.write_str("HALTED"),
        }
    }
}

/// Names what failed at a warning or halting checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointFailure {
    /// Wave the checkpoint followed
    pub wave_index: usize,
    /// Checkpoint name
    pub checkpoint: String,
    /// Labels of failed gates
    pub failing_gates: Vec<String>,
    /// Invalid handoffs as `from -> to`
    pub invalid_handoffs: Vec<String>,
    /// Tasks of the wave that failed
    pub failed_tasks: Vec<TaskId>,
}

impl CheckpointFailure {
    /// Builds the report from a checkpoint result and the wave's failed tasks.
    pub fn from_result(
        wave_index: usize,
        result: &CheckpointResult,
        failed_tasks: Vec<TaskId>,
    ) -> Self {
        Self {
            wave_index,
            checkpoint: result.checkpoint.clone(),
            failing_gates: result.failing_gates(),
            invalid_handoffs: result.invalid_handoffs(),
            failed_tasks,
        }
    }
}

impl fmt::Display for CheckpointFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "checkpoint '{}' after wave {}",
            self.checkpoint, self.wave_index
        )?;
        if !self.failing_gates.is_empty() {
            write!(formatter, "; failing gates: {}", self.failing_gates.join(", "))?;
        }
        if !self.invalid_handoffs.is_empty() {
            write!(
                formatter,
                "; invalid handoffs: {}",
                self.invalid_handoffs.join(", ")
            )?;
        }
        if !self.failed_tasks.is_empty() {
            let tasks: Vec<&str> = self.failed_tasks.iter().map(TaskId::as_str).collect();
            write!(formatter, "; failed tasks: {}", tasks.join(", "))?;
        }
        Ok(())
    }
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Terminal status
    pub status: RunStatus,
    /// Executed waves in order
    pub waves: Vec<WaveSummary>,
    /// Every task of the run: executed ones in wave order, then blocked ones
    pub tasks: Vec<TaskOutcome>,
    /// Non-blocking checkpoint failures
    pub warnings: Vec<CheckpointFailure>,
    /// The blocking checkpoint failure that stopped the run
    pub halt: Option<CheckpointFailure>,
    /// Every event emitted during the run, in order
    pub log: Vec<RunEvent>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run reached its terminal state
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Whether the run was halted by a blocking checkpoint.
    pub fn is_halted(&self) -> bool {
        self.status == RunStatus::Halted
    }

    /// Outcome of a specific task.
    pub fn outcome_for(&self, task_id: &TaskId) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|outcome| &outcome.task_id == task_id)
    }

    /// Tasks with the given status.
    pub fn tasks_with_status(&self, status: TaskStatus) -> Vec<&TaskId> {
        self.tasks
            .iter()
            .filter(|outcome| outcome.status == status)
            .map(|outcome| &outcome.task_id)
            .collect()
    }

    /// Checkpoint results in wave order.
    pub fn checkpoint_results(&self) -> impl Iterator<Item = &CheckpointResult> {
        self.waves
            .iter()
            .filter_map(|wave| wave.checkpoint.as_ref())
    }

    /// Waves the collision policy downgraded to serial.
    pub fn serialized_waves(&self) -> Vec<usize> {
        self.waves
            .iter()
            .filter(|wave| wave.serialized_by_policy)
            .map(|wave| wave.index)
            .collect()
    }
}
