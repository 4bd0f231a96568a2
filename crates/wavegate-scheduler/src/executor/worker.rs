use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use wavegate_core::{Error, Result, Task, Worker};

/// Dispatches tasks to workers by `worker_id`.
///
/// A task naming an unregistered worker fails like any other task; it does
/// not abort the run.
#[derive(Default, Clone)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `worker` under `worker_id`, replacing any previous entry.
    #[must_use]
    pub fn with_worker(mut self, worker_id: impl Into<String>, worker: Arc<dyn Worker>) -> Self {
        self.register(worker_id, worker);
        self
    }

    /// In-place form of [`Self::with_worker`].
    pub fn register(&mut self, worker_id: impl Into<String>, worker: Arc<dyn Worker>) {
        self.workers.insert(worker_id.into(), worker);
    }

    /// Whether a worker is registered under `worker_id`.
    pub fn contains(&self, worker_id: &str) -> bool {
        self.workers.contains_key(worker_id)
    }

    /// Registered worker ids, sorted.
    pub fn worker_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.workers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl Worker for WorkerRegistry {
    async fn invoke(&self, task: &Task) -> Result<String> {
        let Some(worker) = self.workers.get(&task.worker_id) else {
            return Err(Error::task_failed(
                &task.id,
                format!("no worker registered for '{}'", task.worker_id),
            ));
        };
        worker.invoke(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Worker for Echo {
        async fn invoke(&self, task: &Task) -> Result<String> {
            Ok(format!("{} ran {}", self.0, task.id))
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_worker_id() {
        let registry = WorkerRegistry::new()
            .with_worker("coder", Arc::new(Echo("coder")))
            .with_worker("tester", Arc::new(Echo("tester")));

        let output = match registry.invoke(&Task::new("t1", "tester")).await {
            Ok(output) => output,
            Err(error) => panic!("dispatch failed: {error}"),
        };
        assert_eq!(output, "tester ran t1");
        assert_eq!(registry.worker_ids(), vec!["coder", "tester"]);
    }

    #[tokio::test]
    async fn test_unknown_worker_fails_the_task() {
        let registry = WorkerRegistry::new().with_worker("coder", Arc::new(Echo("coder")));
        match registry.invoke(&Task::new("t1", "reviewer")).await {
            Ok(output) => panic!("expected failure, got {output}"),
            Err(error) => {
                assert!(matches!(error, Error::TaskExecution { .. }));
                assert!(error.to_string().contains("reviewer"));
            }
        }
    }
}
