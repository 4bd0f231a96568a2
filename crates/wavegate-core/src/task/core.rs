//! Core task types and basic structures

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operations::FileOperations;

/// Unique identifier for a task
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates an identifier from a planner-supplied name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unit of work with declared dependencies and file side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task
    pub id: TaskId,
    /// Identifier of the worker that performs this task
    pub worker_id: String,
    /// Tasks that must complete before this one
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    /// Declared file operations
    #[serde(default)]
    pub operations: FileOperations,
    /// Current execution status (owned by the executor during a run)
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// Creates a pending task with no dependencies and no declared operations.
    pub fn new(id: impl Into<TaskId>, worker_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            worker_id: worker_id.into(),
            dependencies: BTreeSet::new(),
            operations: FileOperations::default(),
            status: TaskStatus::Pending,
        }
    }

    /// Sets task dependencies.
    #[must_use]
    pub fn with_dependencies<I, T>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the full declared operation set.
    #[must_use]
    pub fn with_operations(mut self, operations: FileOperations) -> Self {
        self.operations = operations;
        self
    }

    /// Declares files this task reads.
    #[must_use]
    pub fn with_reads<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.operations.reads.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Declares files this task modifies.
    #[must_use]
    pub fn with_modifies<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.operations
            .modifies
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Declares files this task creates.
    #[must_use]
    pub fn with_creates<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.operations
            .creates
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Declares files this task deletes.
    #[must_use]
    pub fn with_deletes<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.operations
            .deletes
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Checks whether this task declares any write-like operation.
    pub fn has_side_effects(&self) -> bool {
        !self.operations.modifies.is_empty()
            || !self.operations.creates.is_empty()
            || !self.operations.deletes.is_empty()
    }
}

/// Task lifecycle status.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has not started
    #[default]
    Pending,
    /// Task is executing
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed or timed out
    Failed,
    /// Task never started because the run halted first
    Blocked,
}

impl TaskStatus {
    /// Returns `true` once no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Blocked)
    }

    /// Checks whether moving to `next` is a legal lifecycle step.
    ///
    /// Only `pending → running → {completed | failed}` and `pending → blocked`
    /// are allowed.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Blocked)
                | (Self::Running, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        };
        formatter.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("t1", "coder")
            .with_dependencies(["t0"])
            .with_reads(["src/lib.rs"])
            .with_modifies(["src/main.rs"]);

        assert_eq!(task.id.as_str(), "t1");
        assert_eq!(task.worker_id, "coder");
        assert!(task.dependencies.contains(&TaskId::new("t0")));
        assert!(task.has_side_effects());
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_read_only_task_has_no_side_effects() {
        let task = Task::new("reader", "analyst").with_reads(["a.rs", "b.rs"]);
        assert!(!task.has_side_effects());
    }

    #[test]
    fn test_status_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Blocked));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));

        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Pending));
        assert!(TaskStatus::Blocked.is_terminal());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(TaskId::default(), TaskId::default());
    }
}
