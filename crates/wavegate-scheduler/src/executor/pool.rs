use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::state::{RunPhase, RunState};
use crate::analyzer::CollisionDetector;
use crate::streaming::EventChannel;
use crate::validator::Validator;
use wavegate_core::{
    CheckpointFailure, CheckpointOutcome, CollisionResult, Error, ExecutionMode, Result, RunEvent,
    RunResult, RunStatus, Task, TaskId, TaskOutcome, TaskStatus, Wave, WaveSummary, Worker,
};

/// Runtime limits applied to every wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Upper bound on concurrent invocations in a parallel wave
    pub max_parallelism: usize,
    /// Timeout for a single worker invocation
    pub task_timeout: Option<Duration>,
    /// When false, every wave runs serially
    pub allow_parallel: bool,
}

impl ExecutionPolicy {
    /// Effective concurrency for a wave of `wave_size` tasks.
    pub fn parallelism_for(&self, wave_size: usize) -> usize {
        self.max_parallelism.min(wave_size).max(1)
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            max_parallelism: 4,
            task_timeout: None,
            allow_parallel: true,
        }
    }
}

/// How a wave is going to run, decided before any task starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModePlan {
    /// Effective execution mode
    pub mode: ExecutionMode,
    /// Collision analysis over the wave, when one was performed
    pub collision: Option<CollisionResult>,
    /// Whether the collision policy downgraded a parallel wave
    pub serialized_by_policy: bool,
}

/// Outcomes of one wave's tasks.
#[derive(Debug, Clone)]
pub struct WaveExecution {
    /// Mode decision for the wave
    pub plan: ModePlan,
    /// Per-task outcomes in wave input order
    pub outcomes: Vec<TaskOutcome>,
    /// Time spent running tasks
    pub duration: Duration,
}

impl WaveExecution {
    /// Tasks of the wave that did not complete.
    pub fn failed_tasks(&self) -> Vec<TaskId> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded())
            .map(|outcome| outcome.task_id.clone())
            .collect()
    }
}

/// Drives waves one after another behind a strict barrier.
pub struct WaveExecutor {
    worker: Arc<dyn Worker>,
    detector: CollisionDetector,
    validator: Arc<dyn Validator>,
    policy: ExecutionPolicy,
    events: Option<EventChannel>,
}

impl WaveExecutor {
    /// Create a new wave executor
    pub fn new(worker: Arc<dyn Worker>, validator: Arc<dyn Validator>) -> Self {
        Self {
            worker,
            detector: CollisionDetector::default(),
            validator,
            policy: ExecutionPolicy::default(),
            events: None,
        }
    }

    /// Replaces the collision detector.
    #[must_use]
    pub fn with_detector(mut self, detector: CollisionDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Replaces the execution policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Streams run events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventChannel) -> Self {
        self.events = Some(events);
        self
    }

    /// Active execution policy.
    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Decides the effective mode of `wave`.
    ///
    /// Collision analysis runs only for waves that ask for parallelism and hold
    /// more than one task. Anything other than `ALLOW_PARALLEL` forces serial.
    pub fn plan_mode(&self, wave: &Wave) -> ModePlan {
        if !wave.wants_parallel() || !self.policy.allow_parallel {
            return ModePlan {
                mode: ExecutionMode::Serial,
                collision: None,
                serialized_by_policy: false,
            };
        }

        let collision = self.detector.detect(&wave.tasks);
        let allowed = collision.allows_parallel();
        ModePlan {
            mode: if allowed {
                ExecutionMode::Parallel
            } else {
                ExecutionMode::Serial
            },
            collision: Some(collision),
            serialized_by_policy: !allowed,
        }
    }

    /// Runs every task of `wave` and records its outcome.
    ///
    /// Task failures, timeouts, and panics are contained; siblings keep
    /// running and the wave always returns one outcome per task.
    ///
    /// # Errors
    /// Returns an error only if the run state rejects a status change.
    pub async fn execute_wave(&self, wave: &Wave, state: &mut RunState) -> Result<WaveExecution> {
        let plan = self.plan_mode(wave);

        if plan.serialized_by_policy
            && let Some(collision) = &plan.collision
        {
            warn!(
                wave = wave.index,
                risk = %collision.aggregate_risk,
                resolution = %collision.resolution,
                paths = ?collision.conflicting_paths(),
                "Collision policy override: running wave serially"
            );
            state.record(RunEvent::CollisionOverride {
                wave_index: wave.index,
                collision: collision.clone(),
            });
        }

        info!(
            wave = wave.index,
            tasks = wave.tasks.len(),
            mode = %plan.mode,
            "Starting wave"
        );
        state.record(RunEvent::WaveStarted {
            wave_index: wave.index,
            mode: plan.mode,
            task_ids: wave.task_ids(),
        });

        let start = Instant::now();
        let results = match plan.mode {
            ExecutionMode::Parallel => self.run_parallel(wave, state).await?,
            ExecutionMode::Serial => self.run_serial(wave, state).await?,
        };

        let mut outcomes = Vec::with_capacity(wave.tasks.len());
        for (task, (result, elapsed)) in wave.tasks.iter().zip(results) {
            outcomes.push(Self::finish_task(state, wave.index, task, result, elapsed)?);
        }

        Ok(WaveExecution {
            plan,
            outcomes,
            duration: start.elapsed(),
        })
    }

    async fn run_serial(
        &self,
        wave: &Wave,
        state: &mut RunState,
    ) -> Result<Vec<(Result<String>, Duration)>> {
        let mut results = Vec::with_capacity(wave.tasks.len());
        // Dropping the set aborts the in-flight worker.
        let mut join_set = JoinSet::new();
        for task in &wave.tasks {
            Self::start_task(state, wave.index, &task.id)?;
            join_set.spawn(Self::invoke(
                Arc::clone(&self.worker),
                task.clone(),
                self.policy.task_timeout,
            ));
            results.push(match join_set.join_next().await {
                Some(Ok(result)) => result,
                Some(Err(join_error)) => (
                    Err(Error::task_failed(&task.id, panic_message(&join_error))),
                    Duration::ZERO,
                ),
                None => (
                    Err(Error::task_failed(&task.id, "worker result was lost")),
                    Duration::ZERO,
                ),
            });
        }
        Ok(results)
    }

    async fn run_parallel(
        &self,
        wave: &Wave,
        state: &mut RunState,
    ) -> Result<Vec<(Result<String>, Duration)>> {
        let limit = self.policy.parallelism_for(wave.tasks.len());
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut join_set = JoinSet::new();
        let mut positions = HashMap::new();

        for (position, task) in wave.tasks.iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|error| Error::Other(error.to_string()))?;
            Self::start_task(state, wave.index, &task.id)?;

            let worker = Arc::clone(&self.worker);
            let owned = task.clone();
            let task_timeout = self.policy.task_timeout;
            let handle = join_set.spawn(async move {
                let result = Self::invoke(worker, owned, task_timeout).await;
                drop(permit);
                result
            });
            positions.insert(handle.id(), position);
        }

        let mut slots: Vec<Option<(Result<String>, Duration)>> =
            wave.tasks.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_error) => {
                    let id = join_error.id();
                    let message = positions
                        .get(&id)
                        .and_then(|&position| wave.tasks.get(position))
                        .map_or_else(
                            || Error::Other(panic_message(&join_error)),
                            |task| Error::task_failed(&task.id, panic_message(&join_error)),
                        );
                    (id, (Err(message), Duration::ZERO))
                }
            };
            if let Some(&position) = positions.get(&id)
                && let Some(slot) = slots.get_mut(position)
            {
                *slot = Some(result);
            }
        }

        Ok(wave
            .tasks
            .iter()
            .zip(slots)
            .map(|(task, slot)| {
                slot.unwrap_or_else(|| {
                    (
                        Err(Error::task_failed(&task.id, "worker result was lost")),
                        Duration::ZERO,
                    )
                })
            })
            .collect())
    }

    async fn invoke(
        worker: Arc<dyn Worker>,
        task: Task,
        task_timeout: Option<Duration>,
    ) -> (Result<String>, Duration) {
        let start = Instant::now();
        let result = match task_timeout {
            Some(limit) => match timeout(limit, worker.invoke(&task)).await {
                Ok(result) => result,
                Err(_) => Err(Error::TaskTimeout {
                    task_id: task.id.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }),
            },
            None => worker.invoke(&task).await,
        };
        (result, start.elapsed())
    }

    fn start_task(state: &mut RunState, wave_index: usize, task_id: &TaskId) -> Result<()> {
        state.set_status(task_id, TaskStatus::Running)?;
        debug!(task = %task_id, wave = wave_index, "Task started");
        state.record(RunEvent::TaskStarted {
            task_id: task_id.clone(),
            wave_index,
        });
        Ok(())
    }

    fn finish_task(
        state: &mut RunState,
        wave_index: usize,
        task: &Task,
        result: Result<String>,
        elapsed: Duration,
    ) -> Result<TaskOutcome> {
        let duration_ms = elapsed.as_millis() as u64;
        let (status, output, error) = match result {
            Ok(output) => {
                state.record(RunEvent::TaskCompleted {
                    task_id: task.id.clone(),
                    wave_index,
                    duration_ms,
                });
                (TaskStatus::Completed, Some(output), None)
            }
            Err(error) => {
                warn!(task = %task.id, wave = wave_index, "Task failed: {error}");
                let message = error.to_string();
                state.record(RunEvent::TaskFailed {
                    task_id: task.id.clone(),
                    wave_index,
                    error: message.clone(),
                });
                (TaskStatus::Failed, None, Some(message))
            }
        };
        state.set_status(&task.id, status)?;

        Ok(TaskOutcome {
            task_id: task.id.clone(),
            worker_id: task.worker_id.clone(),
            wave_index,
            status,
            output,
            error,
            duration_ms,
        })
    }

    /// Executes `waves` in order, validating each declared checkpoint.
    ///
    /// A blocking checkpoint failure halts the run; every task of the
    /// remaining waves is reported as blocked. Completed waves are never
    /// rolled back.
    ///
    /// # Errors
    /// Returns a configuration error, before any wave starts, if the waves are
    /// malformed: misnumbered waves, repeated task ids, dependencies that are
    /// missing or not in an earlier wave, or an invalid checkpoint descriptor.
    pub async fn execute_run(&self, waves: Vec<Wave>) -> Result<RunResult> {
        validate_waves(&waves)?;

        let started_at = Utc::now();
        let task_count: usize = waves.iter().map(|wave| wave.tasks.len()).sum();
        let mut state = RunState::new(waves.iter().flat_map(|wave| wave.tasks.iter()))
            .with_events(self.events.clone());
        state.record(RunEvent::RunStarted {
            wave_count: waves.len(),
            task_count,
        });
        info!(waves = waves.len(), tasks = task_count, "Starting run");

        let mut summaries = Vec::with_capacity(waves.len());
        let mut tasks = Vec::with_capacity(task_count);
        let mut halted_at = None;

        for wave in &waves {
            state.transition(RunPhase::RunningWave(wave.index))?;
            let wave_start = Instant::now();
            let execution = self.execute_wave(wave, &mut state).await?;
            state.transition(RunPhase::ValidatingCheckpoint(wave.index))?;

            let checkpoint = match &wave.checkpoint {
                Some(checkpoint) => {
                    let result = self.validator.validate(checkpoint).await;
                    state.record(RunEvent::CheckpointResolved {
                        wave_index: wave.index,
                        checkpoint: result.checkpoint.clone(),
                        outcome: result.outcome,
                    });
                    Some(result)
                }
                None => None,
            };
            let outcome = checkpoint
                .as_ref()
                .map_or(CheckpointOutcome::Continue, |result| result.outcome);

            if let Some(result) = &checkpoint
                && outcome != CheckpointOutcome::Continue
            {
                let failure =
                    CheckpointFailure::from_result(wave.index, result, execution.failed_tasks());
                if outcome == CheckpointOutcome::Halt {
                    warn!(wave = wave.index, "Run halted: {failure}");
                    state.halt(failure)?;
                    halted_at = Some(wave.index);
                } else {
                    warn!(wave = wave.index, "Checkpoint warning: {failure}");
                    state.warn(failure);
                    state.transition(RunPhase::WarnedContinue(wave.index))?;
                }
            }

            summaries.push(WaveSummary {
                index: wave.index,
                task_ids: wave.task_ids(),
                declared_parallel: wave.parallel_execution,
                mode: execution.plan.mode,
                collision: execution.plan.collision,
                serialized_by_policy: execution.plan.serialized_by_policy,
                checkpoint,
                outcome,
                duration_ms: wave_start.elapsed().as_millis() as u64,
            });
            tasks.extend(execution.outcomes);

            if halted_at.is_some() {
                break;
            }
        }

        let status = if let Some(halted_wave) = halted_at {
            for wave in waves.iter().filter(|wave| wave.index > halted_wave) {
                for task in &wave.tasks {
                    state.set_status(&task.id, TaskStatus::Blocked)?;
                    tasks.push(TaskOutcome::blocked(
                        task.id.clone(),
                        task.worker_id.clone(),
                        wave.index,
                    ));
                }
            }
            RunStatus::Halted
        } else {
            state.transition(RunPhase::Completed)?;
            state.record(RunEvent::RunCompleted {
                wave_count: summaries.len(),
            });
            info!(waves = summaries.len(), "Run completed");
            RunStatus::Completed
        };

        let (log, warnings, halt) = state.finish();
        Ok(RunResult {
            status,
            waves: summaries,
            tasks,
            warnings,
            halt,
            log,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Structural checks on externally supplied waves.
fn validate_waves(waves: &[Wave]) -> Result<()> {
    let mut placement: HashMap<&TaskId, usize> = HashMap::new();
    for (position, wave) in waves.iter().enumerate() {
        if wave.index != position {
            return Err(Error::InvalidWave(format!(
                "wave at position {position} has index {}",
                wave.index
            )));
        }
        if let Some(checkpoint) = &wave.checkpoint {
            checkpoint.validate_descriptor()?;
        }
        for task in &wave.tasks {
            if placement.insert(&task.id, wave.index).is_some() {
                return Err(Error::DuplicateTask(task.id.clone()));
            }
        }
    }

    for wave in waves {
        for task in &wave.tasks {
            for dependency in &task.dependencies {
                match placement.get(dependency) {
                    None => {
                        return Err(Error::UnknownDependency {
                            task: task.id.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                    Some(&dependency_wave) if dependency_wave >= wave.index => {
                        return Err(Error::InvalidWave(format!(
                            "task {} in wave {} depends on {dependency} in wave {dependency_wave}",
                            task.id, wave.index
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    Ok(())
}

fn panic_message(join_error: &JoinError) -> String {
    if join_error.is_panic() {
        "worker panicked".to_owned()
    } else {
        format!("worker was cancelled: {join_error}")
    }
}
