use std::collections::{BTreeMap, BTreeSet};

use crate::CollisionConfig;
use wavegate_core::{
    CollisionAnalysis, CollisionResult, FileAccess, FileOperationRecord, OperationKind,
    ResolutionStrategy, RiskLevel, Task, TaskId,
};

/// Classifies collision risk from declared file operations.
#[derive(Debug, Clone, Default)]
pub struct CollisionDetector {
    config: CollisionConfig,
}

impl CollisionDetector {
    /// Creates a detector with the given policy.
    #[must_use]
    pub fn new(config: CollisionConfig) -> Self {
        Self { config }
    }

    /// Computes per-file and aggregate collision risk for `tasks`.
    ///
    /// Only paths with two or more distinct accessors are analyzed. The result
    /// depends on the multiset of operation kinds per path, never on the order
    /// of `tasks`.
    pub fn detect(&self, tasks: &[Task]) -> CollisionResult {
        let record = FileOperationRecord::from_tasks(tasks);

        let analyses: Vec<CollisionAnalysis> = record
            .iter()
            .filter_map(|(path, accesses)| {
                let usage = PathUsage::from_accesses(accesses);
                if usage.accessor_count() < 2 {
                    return None;
                }
                let (risk, reason) = usage.classify();
                Some(CollisionAnalysis {
                    path: path.clone(),
                    accessors: usage.accessors(),
                    risk,
                    reason: reason.to_owned(),
                })
            })
            .collect();

        let aggregate_risk = analyses
            .iter()
            .map(|analysis| analysis.risk)
            .max()
            .unwrap_or(RiskLevel::None);

        let resolution = self.resolve(aggregate_risk);

        CollisionResult {
            analyses,
            aggregate_risk,
            resolution,
            require_serialization: matches!(
                resolution,
                ResolutionStrategy::Serialize | ResolutionStrategy::ManualReview
            ),
        }
    }

    fn resolve(&self, risk: RiskLevel) -> ResolutionStrategy {
        if risk == RiskLevel::Critical && self.config.escalate_critical {
            ResolutionStrategy::ManualReview
        } else {
            ResolutionStrategy::for_risk(risk)
        }
    }
}

/// Runs the default detector over `tasks`.
pub fn detect_collisions(tasks: &[Task]) -> CollisionResult {
    CollisionDetector::default().detect(tasks)
}

/// Operation kinds declared on one path, grouped by task.
struct PathUsage<'record> {
    by_task: BTreeMap<&'record TaskId, BTreeSet<OperationKind>>,
}

impl<'record> PathUsage<'record> {
    fn from_accesses(accesses: &'record [FileAccess]) -> Self {
        let mut by_task: BTreeMap<&TaskId, BTreeSet<OperationKind>> = BTreeMap::new();
        for access in accesses {
            by_task.entry(&access.task_id).or_default().insert(access.kind);
        }
        Self { by_task }
    }

    fn accessor_count(&self) -> usize {
        self.by_task.len()
    }

    fn accessors(&self) -> Vec<TaskId> {
        self.by_task.keys().map(|&task_id| task_id.clone()).collect()
    }

    fn tasks_with(&self, kind: OperationKind) -> usize {
        self.by_task
            .values()
            .filter(|kinds| kinds.contains(&kind))
            .count()
    }

    fn writer_count(&self) -> usize {
        self.by_task
            .values()
            .filter(|kinds| kinds.iter().any(|kind| kind.is_write()))
            .count()
    }

    fn classify(&self) -> (RiskLevel, &'static str) {
        let modifiers = self.tasks_with(OperationKind::Modify);
        let creators = self.tasks_with(OperationKind::Create);
        let deleters = self.tasks_with(OperationKind::Delete);
        let writers = self.writer_count();

        if writers == 0 && deleters == 0 {
            return (RiskLevel::None, "all accesses are reads");
        }
        if deleters > 0 && writers > 0 {
            return (RiskLevel::Critical, "destructive operation conflict");
        }
        if modifiers >= 2 {
            return (RiskLevel::High, "multiple tasks modifying same file");
        }
        if deleters >= 2 {
            return (RiskLevel::High, "multiple tasks deleting same file");
        }
        if deleters == 1 {
            return (RiskLevel::High, "delete with concurrent reads");
        }
        if creators >= 2 && modifiers == 0 {
            return (RiskLevel::Medium, "multiple tasks creating same file");
        }
        if writers == 1 {
            return (RiskLevel::Low, "write with concurrent reads");
        }
        (RiskLevel::High, "conflicting writes to same file")
    }
}
