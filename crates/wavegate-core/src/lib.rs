//! Core types and traits for the wave scheduler.
//!
//! This crate provides the file access model shared by every component:
//! tasks and their declared file operations, waves, checkpoints, collision
//! and run results, error handling, and the worker/gate trait seams.

/// Checkpoint descriptors, gate reports, and checkpoint results.
pub mod checkpoint;
/// Collision analysis types.
pub mod collision;
/// Error types and result definitions.
pub mod error;
/// Run progress events.
pub mod events;
/// Run-level results.
pub mod run;
/// Tasks and declared file operations.
pub mod task;
/// Trait definitions for workers and gate checks.
pub mod traits;
/// Waves and wave descriptors.
pub mod wave;

pub use checkpoint::{
    Checkpoint, CheckpointOutcome, CheckpointResult, GateDescriptor, GateKind, GateReport,
    HandoffDescriptor, HandoffResult, QualityGateResult,
};
pub use collision::{
    CollisionAnalysis, CollisionResult, FileAccess, FileOperationRecord, ResolutionStrategy,
    RiskLevel,
};
pub use error::{Error, Result};
pub use events::RunEvent;
pub use run::{CheckpointFailure, RunResult, RunStatus, TaskOutcome, WaveSummary};
pub use task::{FileOperations, OperationKind, Task, TaskId, TaskStatus};
pub use traits::{GateCheck, Worker};
pub use wave::{ExecutionMode, Wave, WaveDescriptor};
