use core::result::Result as CoreResult;
use std::io::Error as IoError;

use thiserror::Error;
use toml::de::Error as TomlError;

use crate::task::TaskId;

/// Result type for scheduling operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while planning, executing, or gating a run.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// The task dependency graph contains a cycle.
    #[error("Cyclic dependency detected in task graph: {}", join_ids(.0))]
    CyclicDependency(Vec<TaskId>),

    /// Two tasks share the same identifier.
    #[error("Duplicate task id: {0}")]
    DuplicateTask(TaskId),

    /// A task depends on a task that is not part of the plan.
    #[error("Task {task} depends on unknown task {dependency}")]
    UnknownDependency {
        /// Task declaring the dependency
        task: TaskId,
        /// Dependency that could not be resolved
        dependency: TaskId,
    },

    /// A checkpoint descriptor is malformed.
    #[error("Invalid checkpoint '{checkpoint}': {reason}")]
    InvalidCheckpoint {
        /// Checkpoint name (may be empty when the name itself is the problem)
        checkpoint: String,
        /// What is wrong with it
        reason: String,
    },

    /// A wave descriptor does not match the computed waves.
    #[error("Invalid wave descriptor: {0}")]
    InvalidWave(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker invocation failed.
    #[error("Task {task_id} failed: {message}")]
    TaskExecution {
        /// Task whose worker failed
        task_id: TaskId,
        /// Failure detail reported by the worker
        message: String,
    },

    /// A worker invocation exceeded its timeout.
    #[error("Task {task_id} timed out after {timeout_ms}ms")]
    TaskTimeout {
        /// Task whose worker timed out
        task_id: TaskId,
        /// Timeout that was exceeded
        timeout_ms: u64,
    },

    /// A quality gate check could not be executed.
    #[error("Gate '{label}' failed to execute: {message}")]
    GateExecution {
        /// Gate label
        label: String,
        /// Failure detail
        message: String,
    },

    /// A quality gate check exceeded its timeout.
    #[error("Gate '{label}' timed out after {timeout_ms}ms")]
    GateTimeout {
        /// Gate label
        label: String,
        /// Timeout that was exceeded
        timeout_ms: u64,
    },

    /// An illegal run state transition was attempted.
    #[error("Invalid run transition: {0}")]
    InvalidTransition(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` for errors that must abort a run before any wave starts.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency(_)
                | Self::DuplicateTask(_)
                | Self::UnknownDependency { .. }
                | Self::InvalidCheckpoint { .. }
                | Self::InvalidWave(_)
                | Self::Config(_)
                | Self::Toml(_)
        )
    }

    /// Determines whether a caller-initiated re-run may succeed.
    ///
    /// Returns `true` for transient failures such as timeouts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TaskTimeout { .. } | Self::GateTimeout { .. } | Self::Io(_)
        )
    }

    /// Builds a task execution error from any displayable message.
    pub fn task_failed(task_id: &TaskId, message: impl Into<String>) -> Self {
        Self::TaskExecution {
            task_id: task_id.clone(),
            message: message.into(),
        }
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
