use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::analyzer::CollisionDetector;
use crate::config::SchedulerConfig;
use crate::executor::{WaveExecutor, WaveScheduler};
use crate::plan::PlanFile;
use crate::streaming::EventChannel;
use crate::validator::{CheckpointValidator, Validator};
use wavegate_core::{Result, RunResult, Task, Wave, WaveDescriptor, Worker};

/// High-level driver composing scheduling, collision policy, execution, and
/// checkpoint validation into one run.
#[derive(Clone)]
pub struct WaveOrchestrator {
    config: SchedulerConfig,
    scheduler: WaveScheduler,
    worker: Arc<dyn Worker>,
    validator: Arc<dyn Validator>,
    events: Option<EventChannel>,
}

impl WaveOrchestrator {
    /// Creates an orchestrator with the default checkpoint validator.
    pub fn new(config: SchedulerConfig, worker: Arc<dyn Worker>) -> Self {
        let validator = Arc::new(CheckpointValidator::from_config(&config.validation));
        Self {
            config,
            scheduler: WaveScheduler::new(),
            worker,
            validator,
            events: None,
        }
    }

    /// Sets a custom validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Streams run events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventChannel) -> Self {
        self.events = Some(events);
        self
    }

    /// Configuration the orchestrator was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Computes the waves a run would execute, without executing anything.
    ///
    /// # Errors
    /// Returns a configuration error for cycles, unknown or duplicate ids, and
    /// malformed descriptors.
    pub fn plan(&self, tasks: &[Task], descriptors: Vec<WaveDescriptor>) -> Result<Vec<Wave>> {
        self.scheduler.compute_waves_with(tasks, descriptors)
    }

    /// Schedules and executes `tasks`.
    ///
    /// # Errors
    /// Returns a configuration error before any task runs; task and gate
    /// failures are reported in the [`RunResult`] instead.
    pub async fn run(&self, tasks: &[Task], descriptors: Vec<WaveDescriptor>) -> Result<RunResult> {
        let waves = self
            .config
            .validate()
            .and_then(|()| self.plan(tasks, descriptors))
            .inspect_err(|error| {
                error!("Rejected run configuration: {error}");
            })?;

        let result = self.executor().execute_run(waves).await?;
        info!(
            status = %result.status,
            waves = result.waves.len(),
            warnings = result.warnings.len(),
            "Run finished"
        );
        Ok(result)
    }

    /// Loads a TOML plan file and runs it.
    ///
    /// # Errors
    /// Returns an error if the plan cannot be loaded or is not a valid configuration.
    pub async fn run_plan(&self, path: &Path) -> Result<RunResult> {
        let (tasks, descriptors) = PlanFile::load(path)?.into_parts(&self.config.validation)?;
        self.run(&tasks, descriptors).await
    }

    fn executor(&self) -> WaveExecutor {
        let executor = WaveExecutor::new(Arc::clone(&self.worker), Arc::clone(&self.validator))
            .with_detector(CollisionDetector::new(self.config.collision.clone()))
            .with_policy(self.config.execution.policy());
        match &self.events {
            Some(events) => executor.with_events(events.clone()),
            None => executor,
        }
    }
}
