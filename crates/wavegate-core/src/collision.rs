//! Collision analysis types shared by the detector and its consumers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::task::{OperationKind, Task, TaskId};

/// Severity of a file collision. Ordering is total: `None < Low < Medium < High < Critical`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Concurrent access is safe
    #[default]
    None,
    /// One writer with concurrent readers
    Low,
    /// Several tasks create the same file
    Medium,
    /// Several tasks write the same file
    High,
    /// A delete races a write
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        formatter.write_str(label)
    }
}

/// How a task set should be run given its collisions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStrategy {
    /// Tasks may run concurrently
    #[default]
    AllowParallel,
    /// Tasks should be split into separate batches
    Reschedule,
    /// Tasks must run one after another
    Serialize,
    /// A human should approve before the tasks run
    ManualReview,
}

impl ResolutionStrategy {
    /// Maps an aggregate risk to its resolution.
    pub fn for_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::None | RiskLevel::Low => Self::AllowParallel,
            RiskLevel::Medium => Self::Reschedule,
            RiskLevel::High | RiskLevel::Critical => Self::Serialize,
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AllowParallel => "ALLOW_PARALLEL",
            Self::Reschedule => "RESCHEDULE",
            Self::Serialize => "SERIALIZE",
            Self::ManualReview => "MANUAL_REVIEW",
        };
        formatter.write_str(label)
    }
}

/// A single declared access to a path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileAccess {
    /// Task declaring the access
    pub task_id: TaskId,
    /// Kind of access
    pub kind: OperationKind,
}

/// Path → declared accesses, built from a task set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperationRecord {
    accesses: BTreeMap<PathBuf, Vec<FileAccess>>,
}

impl FileOperationRecord {
    /// Builds the record for every declared operation of every task.
    pub fn from_tasks<'task, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'task Task>,
    {
        let mut record = Self::default();
        for task in tasks {
            record.record_task(task);
        }
        record
    }

    /// Appends every declared operation of `task`.
    pub fn record_task(&mut self, task: &Task) {
        for (path, kind) in task.operations.iter() {
            self.accesses
                .entry(path.clone())
                .or_default()
                .push(FileAccess {
                    task_id: task.id.clone(),
                    kind,
                });
        }
    }

    /// Accesses declared on `path`.
    pub fn accesses(&self, path: &Path) -> &[FileAccess] {
        self.accesses
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates paths in sorted order with their accesses.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &[FileAccess])> {
        self.accesses
            .iter()
            .map(|(path, accesses)| (path, accesses.as_slice()))
    }

    /// Number of distinct paths recorded.
    pub fn path_count(&self) -> usize {
        self.accesses.len()
    }
}

/// Classification of one path accessed by two or more tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionAnalysis {
    /// Path being accessed
    pub path: PathBuf,
    /// Distinct tasks accessing the path, sorted
    pub accessors: Vec<TaskId>,
    /// Risk assigned to the path
    pub risk: RiskLevel,
    /// Human-readable explanation
    pub reason: String,
}

/// Collision verdict for a task set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionResult {
    /// Per-path analyses, sorted by path
    pub analyses: Vec<CollisionAnalysis>,
    /// Maximum risk over all analyses
    pub aggregate_risk: RiskLevel,
    /// Chosen resolution
    pub resolution: ResolutionStrategy,
    /// Whether the task set must run serially
    pub require_serialization: bool,
}

impl CollisionResult {
    /// Returns `true` when the task set may run concurrently.
    pub fn allows_parallel(&self) -> bool {
        self.resolution == ResolutionStrategy::AllowParallel
    }

    /// Paths whose risk is above `NONE`.
    pub fn conflicting_paths(&self) -> Vec<&Path> {
        self.analyses
            .iter()
            .filter(|analysis| analysis.risk > RiskLevel::None)
            .map(|analysis| analysis.path.as_path())
            .collect()
    }

    /// Analyses at exactly the aggregate risk (the ones driving the resolution).
    pub fn worst(&self) -> impl Iterator<Item = &CollisionAnalysis> {
        self.analyses
            .iter()
            .filter(|analysis| analysis.risk == self.aggregate_risk)
    }

    /// One-line description naming the worst paths and their tasks.
    pub fn summary(&self) -> String {
        let worst: Vec<String> = self
            .worst()
            .filter(|analysis| analysis.risk > RiskLevel::None)
            .map(|analysis| {
                let accessors: Vec<&str> =
                    analysis.accessors.iter().map(TaskId::as_str).collect();
                format!(
                    "{} [{}]: {}",
                    analysis.path.display(),
                    accessors.join(", "),
                    analysis.reason
                )
            })
            .collect();

        if worst.is_empty() {
            format!("{} ({})", self.resolution, self.aggregate_risk)
        } else {
            format!(
                "{} ({}): {}",
                self.resolution,
                self.aggregate_risk,
                worst.join("; ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_ordering_is_total() {
        assert!(RiskLevel::None < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(
            [RiskLevel::High, RiskLevel::Critical, RiskLevel::Low]
                .into_iter()
                .max(),
            Some(RiskLevel::Critical)
        );
    }

    #[test]
    fn test_resolution_mapping() {
        assert_eq!(
            ResolutionStrategy::for_risk(RiskLevel::None),
            ResolutionStrategy::AllowParallel
        );
        assert_eq!(
            ResolutionStrategy::for_risk(RiskLevel::Low),
            ResolutionStrategy::AllowParallel
        );
        assert_eq!(
            ResolutionStrategy::for_risk(RiskLevel::Medium),
            ResolutionStrategy::Reschedule
        );
        assert_eq!(
            ResolutionStrategy::for_risk(RiskLevel::High),
            ResolutionStrategy::Serialize
        );
        assert_eq!(
            ResolutionStrategy::for_risk(RiskLevel::Critical),
            ResolutionStrategy::Serialize
        );
    }

    #[test]
    fn test_record_groups_by_path() {
        let first = Task::new("t1", "w").with_modifies(["f.rs"]).with_reads(["g.rs"]);
        let second = Task::new("t2", "w").with_reads(["f.rs"]);

        let record = FileOperationRecord::from_tasks([&first, &second]);
        assert_eq!(record.path_count(), 2);
        assert_eq!(record.accesses(Path::new("f.rs")).len(), 2);
        assert_eq!(record.accesses(Path::new("g.rs")).len(), 1);
        assert!(record.accesses(Path::new("missing.rs")).is_empty());
    }

    #[test]
    fn test_serialized_names() {
        let json = match serde_json::to_string(&ResolutionStrategy::AllowParallel) {
            Ok(json) => json,
            Err(error) => panic!("serialize failed: {error}"),
        };
        assert_eq!(json, "\"ALLOW_PARALLEL\"");
    }
}
