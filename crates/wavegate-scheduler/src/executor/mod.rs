/// Task dependency graph and layering.
pub mod graph;
/// Wave executor and execution policy.
pub mod pool;
/// Wave computation from tasks and descriptors.
pub mod scheduler;
/// Run phase machine and per-run state.
pub mod state;
/// Worker dispatch by id.
pub mod worker;

pub use graph::TaskGraph;
pub use pool::{ExecutionPolicy, ModePlan, WaveExecution, WaveExecutor};
pub use scheduler::WaveScheduler;
pub use state::{RunPhase, RunState};
pub use worker::WorkerRegistry;
