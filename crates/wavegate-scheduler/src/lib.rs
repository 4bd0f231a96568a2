//! Wave scheduling, collision policy, execution, and checkpoint validation.
//!
//! Tasks are layered into dependency-respecting waves, each wave is checked for
//! unsafe concurrent file access before it runs in parallel, and checkpoints
//! between waves decide whether the run continues, warns, or halts.

/// Collision analysis over declared file operations.
pub mod analyzer;
pub mod config;
/// Wave layering, the run state machine, and wave execution.
pub mod executor;
/// High-level run driver.
pub mod orchestrator;
pub mod plan;
pub mod streaming;
/// Checkpoint validation: gates, handoffs, and the validator pipeline.
pub mod validator;

pub use analyzer::{CollisionDetector, detect_collisions};
pub use config::{CollisionConfig, ExecutionConfig, SchedulerConfig, ValidationConfig};
pub use executor::{
    ExecutionPolicy, ModePlan, RunPhase, RunState, TaskGraph, WaveExecution, WaveExecutor,
    WaveScheduler, WorkerRegistry,
};
pub use orchestrator::WaveOrchestrator;
pub use plan::PlanFile;
pub use streaming::EventChannel;
pub use validator::{CheckpointValidator, CommandCheck, FnCheck, StaticCheck, Validator};
pub use wavegate_core::{Error, Result};
