use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointOutcome;
use crate::collision::CollisionResult;
use crate::run::CheckpointFailure;
use crate::task::TaskId;
use crate::wave::ExecutionMode;

/// Event emitted while a run progresses.
///
/// Every event is appended to the run log; an attached channel receives the
/// same sequence as it happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// Run accepted and about to execute its first wave
    RunStarted {
        /// Number of waves in the run
        wave_count: usize,
        /// Number of tasks in the run
        task_count: usize,
    },
    /// A wave began executing
    WaveStarted {
        /// Wave index
        wave_index: usize,
        /// Effective execution mode
        mode: ExecutionMode,
        /// Tasks of the wave in input order
        task_ids: Vec<TaskId>,
    },
    /// A wave that asked for parallelism was downgraded to serial
    CollisionOverride {
        /// Wave index
        wave_index: usize,
        /// Collision analysis that triggered the downgrade
        collision: CollisionResult,
    },
    /// Worker invocation started
    TaskStarted {
        /// ID of the task
        task_id: TaskId,
        /// Wave index
        wave_index: usize,
    },
    /// Worker invocation finished successfully
    TaskCompleted {
        /// ID of the task
        task_id: TaskId,
        /// Wave index
        wave_index: usize,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// Worker invocation failed, timed out, or panicked
    TaskFailed {
        /// ID of the task
        task_id: TaskId,
        /// Wave index
        wave_index: usize,
        /// Error text
        error: String,
    },
    /// A checkpoint produced its decision
    CheckpointResolved {
        /// Wave index
        wave_index: usize,
        /// Checkpoint name
        checkpoint: String,
        /// Decision
        outcome: CheckpointOutcome,
    },
    /// A non-blocking checkpoint failed; the run continues
    CheckpointWarning(CheckpointFailure),
    /// A blocking checkpoint failed; no further wave runs
    RunHalted(CheckpointFailure),
    /// Every wave ran
    RunCompleted {
        /// Number of executed waves
        wave_count: usize,
    },
}

impl RunEvent {
    /// Wave the event refers to, if any.
    pub fn wave_index(&self) -> Option<usize> {
        match self {
            Self::WaveStarted { wave_index, .. }
            | Self::CollisionOverride { wave_index, .. }
            | Self::TaskStarted { wave_index, .. }
            | Self::TaskCompleted { wave_index, .. }
            | Self::TaskFailed { wave_index, .. }
            | Self::CheckpointResolved { wave_index, .. } => Some(*wave_index),
            Self::CheckpointWarning(failure) | Self::RunHalted(failure) => {
                Some(failure.wave_index)
            }
            Self::RunStarted { .. } | Self::RunCompleted { .. } => None,
        }
    }

    /// Whether the event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunHalted(_) | Self::RunCompleted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wave_index() {
        let started = RunEvent::TaskStarted {
            task_id: TaskId::new("a"),
            wave_index: 3,
        };
        assert_eq!(started.wave_index(), Some(3));
        assert!(!started.is_terminal());

        let done = RunEvent::RunCompleted { wave_count: 2 };
        assert_eq!(done.wave_index(), None);
        assert!(done.is_terminal());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = RunEvent::WaveStarted {
            wave_index: 0,
            mode: ExecutionMode::Serial,
            task_ids: vec![TaskId::new("a")],
        };
        let json = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(error) => panic!("serialization failed: {error}"),
        };
        assert_eq!(json["event"], "wave_started");
        assert_eq!(json["mode"], "serial");
    }
}
