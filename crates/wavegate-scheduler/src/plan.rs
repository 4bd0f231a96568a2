//! TOML plan files: tasks plus per-wave descriptors.
//!
//! ```toml
//! [[tasks]]
//! id = "schema"
//! worker = "coder"
//! modifies = ["src/schema.rs"]
//!
//! [[tasks]]
//! id = "api"
//! worker = "coder"
//! depends_on = ["schema"]
//! reads = ["src/schema.rs"]
//!
//! [[waves]]
//! index = 0
//!
//! [waves.checkpoint]
//! name = "post-schema"
//! blocking = true
//!
//! [[waves.checkpoint.gates]]
//! label = "tests"
//! command = "cargo"
//! args = ["test"]
//! ```

use crate::config::ValidationConfig;
use crate::validator::CommandCheck;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use wavegate_core::{
    Checkpoint, Error, FileOperations, GateDescriptor, HandoffDescriptor, Result, Task,
    WaveDescriptor,
};

/// Parsed plan file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    /// Tasks in input order
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
    /// Wave descriptors keyed by index
    #[serde(default)]
    pub waves: Vec<WaveEntry>,
}

/// One `[[tasks]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    /// Unique task id
    pub id: String,
    /// Worker the task is dispatched to
    pub worker: String,
    /// Ids of tasks that must finish first
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Paths only read
    #[serde(default)]
    pub reads: Vec<PathBuf>,
    /// Existing paths changed in place
    #[serde(default)]
    pub modifies: Vec<PathBuf>,
    /// Paths written as new files
    #[serde(default)]
    pub creates: Vec<PathBuf>,
    /// Paths removed
    #[serde(default)]
    pub deletes: Vec<PathBuf>,
}

/// One `[[waves]]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaveEntry {
    /// Index of the computed wave this entry applies to
    pub index: usize,
    /// Overrides the declared parallelism
    pub parallel: Option<bool>,
    /// Checkpoint evaluated after the wave
    pub checkpoint: Option<CheckpointEntry>,
}

/// A wave's `[waves.checkpoint]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointEntry {
    /// Checkpoint name, unique within reports
    pub name: String,
    /// Whether a failure halts the run; defaults to `true`
    #[serde(default = "default_blocking")]
    pub blocking: bool,
    /// Gates in evaluation order
    #[serde(default)]
    pub gates: Vec<GateEntry>,
    /// Handoffs checked after the gates
    #[serde(default)]
    pub handoffs: Vec<HandoffDescriptor>,
}

const fn default_blocking() -> bool {
    true
}

/// How a command gate is judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKindEntry {
    /// Passes on success without failure indicators
    #[default]
    Boolean,
    /// Passes when the extracted value reaches `required`
    Threshold,
}

/// One `[[waves.checkpoint.gates]]` table, backed by an external command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateEntry {
    /// Gate label, unique within the checkpoint
    pub label: String,
    /// How the report is judged
    #[serde(default)]
    pub kind: GateKindEntry,
    /// Required value for threshold gates
    pub required: Option<f64>,
    /// Program to run
    pub command: String,
    /// Program arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Directory to run the program in
    pub working_dir: Option<PathBuf>,
    /// Regex extracting the measured value from stdout
    pub value_pattern: Option<String>,
    /// Overrides the configured failure indicators
    pub failure_indicators: Option<Vec<String>>,
    /// Overrides the configured gate timeout
    pub timeout_seconds: Option<u64>,
}

impl PlanFile {
    /// Parses a plan from TOML text.
    ///
    /// # Errors
    /// Returns `Error::Toml` if the text is not a valid plan.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads a plan from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Converts the plan into tasks and wave descriptors.
    ///
    /// Command gates become [`CommandCheck`]s; gates without explicit failure
    /// indicators use the configured ones.
    ///
    /// # Errors
    /// Returns `Error::Config` for threshold gates without `required`, invalid
    /// value patterns, or zero timeouts.
    pub fn into_parts(
        self,
        validation: &ValidationConfig,
    ) -> Result<(Vec<Task>, Vec<WaveDescriptor>)> {
        let tasks = self.tasks.into_iter().map(TaskEntry::into_task).collect();
        let descriptors = self
            .waves
            .into_iter()
            .map(|wave| wave.into_descriptor(validation))
            .collect::<Result<Vec<_>>>()?;
        Ok((tasks, descriptors))
    }
}

impl TaskEntry {
    fn into_task(self) -> Task {
        Task::new(self.id, self.worker)
            .with_dependencies(self.depends_on)
            .with_operations(FileOperations {
                reads: self.reads.into_iter().collect(),
                modifies: self.modifies.into_iter().collect(),
                creates: self.creates.into_iter().collect(),
                deletes: self.deletes.into_iter().collect(),
            })
    }
}

impl WaveEntry {
    fn into_descriptor(self, validation: &ValidationConfig) -> Result<WaveDescriptor> {
        let mut descriptor = WaveDescriptor::new(self.index);
        descriptor.parallel = self.parallel;
        if let Some(entry) = self.checkpoint {
            descriptor.checkpoint = Some(entry.into_checkpoint(validation)?);
        }
        Ok(descriptor)
    }
}

impl CheckpointEntry {
    fn into_checkpoint(self, validation: &ValidationConfig) -> Result<Checkpoint> {
        let mut checkpoint = Checkpoint::new(self.name, self.blocking);
        for gate in self.gates {
            let descriptor = gate.into_descriptor(&checkpoint.name, validation)?;
            checkpoint = checkpoint.with_gate(descriptor);
        }
        checkpoint.handoffs = self.handoffs;
        Ok(checkpoint)
    }
}

impl GateEntry {
    fn into_descriptor(
        self,
        checkpoint: &str,
        validation: &ValidationConfig,
    ) -> Result<GateDescriptor> {
        let mut check = CommandCheck::new(self.command)
            .with_args(self.args)
            .with_failure_indicators(
                self.failure_indicators
                    .unwrap_or_else(|| validation.failure_indicators.clone()),
            );
        if let Some(working_dir) = self.working_dir {
            check = check.with_working_dir(working_dir);
        }
        if let Some(pattern) = &self.value_pattern {
            check = check.with_value_pattern(pattern)?;
        }

        let mut descriptor = match self.kind {
            GateKindEntry::Boolean => GateDescriptor::boolean(self.label, Arc::new(check)),
            GateKindEntry::Threshold => {
                let Some(required) = self.required else {
                    return Err(Error::Config(format!(
                        "threshold gate '{}' in checkpoint '{checkpoint}' has no required value",
                        self.label
                    )));
                };
                GateDescriptor::threshold(self.label, required, Arc::new(check))
            }
        };
        if let Some(seconds) = self.timeout_seconds {
            if seconds == 0 {
                return Err(Error::Config(format!(
                    "gate '{}' in checkpoint '{checkpoint}' has a zero timeout",
                    descriptor.label
                )));
            }
            descriptor = descriptor.with_timeout(Duration::from_secs(seconds));
        }
        Ok(descriptor)
    }
}
