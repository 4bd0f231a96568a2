//! Waves: dependency-respecting batches of tasks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::task::{Task, TaskId};

/// How a wave's tasks are actually invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Tasks run concurrently
    Parallel,
    /// Tasks run one at a time in input order
    Serial,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parallel => formatter.write_str("parallel"),
            Self::Serial => formatter.write_str("serial"),
        }
    }
}

/// A batch of tasks considered for simultaneous execution.
#[derive(Debug, Clone)]
pub struct Wave {
    /// Position of the wave in the run
    pub index: usize,
    /// Tasks in input order
    pub tasks: Vec<Task>,
    /// Declared intent to run in parallel
    pub parallel_execution: bool,
    /// Checkpoint validated after the wave
    pub checkpoint: Option<Checkpoint>,
}

impl Wave {
    /// Creates a wave; multi-task waves default to parallel.
    pub fn new(index: usize, tasks: Vec<Task>) -> Self {
        let parallel_execution = tasks.len() > 1;
        Self {
            index,
            tasks,
            parallel_execution,
            checkpoint: None,
        }
    }

    /// Overrides the declared parallelism.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel_execution = parallel;
        self
    }

    /// Attaches a checkpoint.
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Identifiers of the wave's tasks in order.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|task| task.id.clone()).collect()
    }

    /// Whether collision analysis is needed before running this wave.
    pub fn wants_parallel(&self) -> bool {
        self.parallel_execution && self.tasks.len() > 1
    }
}

/// Caller overrides applied to a computed wave.
#[derive(Debug, Clone, Default)]
pub struct WaveDescriptor {
    /// Index of the wave the descriptor applies to
    pub index: usize,
    /// Explicit parallelism; `None` keeps the default
    pub parallel: Option<bool>,
    /// Checkpoint to validate after the wave
    pub checkpoint: Option<Checkpoint>,
}

impl WaveDescriptor {
    /// Creates an empty descriptor for `index`.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            parallel: None,
            checkpoint: None,
        }
    }

    /// Marks the wave's parallelism explicitly.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Attaches a checkpoint.
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }
}
