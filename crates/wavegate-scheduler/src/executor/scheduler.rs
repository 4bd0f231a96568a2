use super::graph::TaskGraph;
use std::collections::HashSet;
use tracing::debug;
use wavegate_core::{Error, Result, Task, Wave, WaveDescriptor};

/// Layers tasks into dependency-respecting waves.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveScheduler;

impl WaveScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Computes waves with default parallelism and no checkpoints.
    ///
    /// # Errors
    /// Returns a configuration error for cycles, duplicate ids, or unknown
    /// dependencies. No wave is produced in that case.
    pub fn compute_waves(&self, tasks: &[Task]) -> Result<Vec<Wave>> {
        self.compute_waves_with(tasks, Vec::new())
    }

    /// Computes waves and applies caller descriptors keyed by wave index.
    ///
    /// # Errors
    /// Fails like [`Self::compute_waves`], and additionally when a descriptor
    /// targets a wave that does not exist, two descriptors share an index, or
    /// a checkpoint descriptor is malformed.
    pub fn compute_waves_with(
        &self,
        tasks: &[Task],
        descriptors: Vec<WaveDescriptor>,
    ) -> Result<Vec<Wave>> {
        let graph = TaskGraph::from_tasks(tasks)?;
        let layers = graph.layers()?;

        let mut waves: Vec<Wave> = layers
            .into_iter()
            .enumerate()
            .map(|(index, layer)| Wave::new(index, layer))
            .collect();

        let mut seen = HashSet::new();
        for descriptor in descriptors {
            if !seen.insert(descriptor.index) {
                return Err(Error::InvalidWave(format!(
                    "more than one descriptor for wave {}",
                    descriptor.index
                )));
            }
            let wave_count = waves.len();
            let Some(wave) = waves.get_mut(descriptor.index) else {
                return Err(Error::InvalidWave(format!(
                    "descriptor targets wave {} but only {wave_count} waves exist",
                    descriptor.index
                )));
            };
            if let Some(parallel) = descriptor.parallel {
                wave.parallel_execution = parallel;
            }
            if let Some(checkpoint) = descriptor.checkpoint {
                checkpoint.validate_descriptor()?;
                wave.checkpoint = Some(checkpoint);
            }
        }

        debug!(
            task_count = graph.task_count(),
            wave_count = waves.len(),
            "Computed waves"
        );

        Ok(waves)
    }
}
