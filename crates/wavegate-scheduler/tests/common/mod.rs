//! Common test utilities and helpers for wavegate-scheduler tests
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, Once};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::{EnvFilter, fmt};
use wavegate_core::{Error, Result, Task, TaskId, Worker};

// ----------------------------------------------------------------------------
// Tracing initialization for tests
// ----------------------------------------------------------------------------

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (idempotent).
/// Honors `RUST_LOG` if set, otherwise defaults to "debug".
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_owned());
        if fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .try_init()
            .is_err()
        {
            // tracing already initialized in this process
        }
    });
}

// ----------------------------------------------------------------------------
// Fake workers
// ----------------------------------------------------------------------------

/// What a scripted worker does for one task.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Return immediately with success
    Succeed,
    /// Return immediately with an error
    Fail,
    /// Sleep, then succeed
    Delay(Duration),
    /// Never finish on its own
    Hang,
    /// Panic inside the worker
    Panic,
}

/// Worker that follows a per-task script and records what it observed.
pub struct ScriptedWorker {
    default: Behavior,
    script: HashMap<TaskId, Behavior>,
    started: Mutex<Vec<TaskId>>,
    finished: Mutex<Vec<TaskId>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedWorker {
    /// Every task gets `default` unless scripted otherwise.
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            script: HashMap::new(),
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Instant success for every task.
    pub fn succeeding() -> Self {
        Self::new(Behavior::Succeed)
    }

    /// Deterministic delay for every task.
    pub fn delayed(millis: u64) -> Self {
        Self::new(Behavior::Delay(Duration::from_millis(millis)))
    }

    /// Overrides the behavior for one task.
    #[must_use]
    pub fn with(mut self, task_id: &str, behavior: Behavior) -> Self {
        self.script.insert(TaskId::new(task_id), behavior);
        self
    }

    /// Task ids in the order their invocations began.
    pub fn started(&self) -> Vec<TaskId> {
        lock(&self.started).clone()
    }

    /// Task ids in the order their invocations finished.
    pub fn finished(&self) -> Vec<TaskId> {
        lock(&self.finished).clone()
    }

    /// Highest number of simultaneously running invocations.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self, task_id: &TaskId) {
        lock(&self.started).push(task_id.clone());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self, task_id: &TaskId) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        lock(&self.finished).push(task_id.clone());
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    async fn invoke(&self, task: &Task) -> Result<String> {
        let behavior = self.script.get(&task.id).copied().unwrap_or(self.default);
        self.enter(&task.id);
        let result = match behavior {
            Behavior::Succeed => Ok(format!("{} done", task.id)),
            Behavior::Fail => Err(Error::task_failed(&task.id, "scripted failure")),
            Behavior::Delay(duration) => {
                sleep(duration).await;
                Ok(format!("{} done after {}ms", task.id, duration.as_millis()))
            }
            Behavior::Hang => {
                sleep(Duration::from_secs(3600)).await;
                Ok(format!("{} woke up", task.id))
            }
            Behavior::Panic => {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("scripted panic in {}", task.id);
            }
        };
        self.leave(&task.id);
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Task ids as owned values, for comparisons.
pub fn ids(names: &[&str]) -> Vec<TaskId> {
    names.iter().map(|name| TaskId::new(*name)).collect()
}
