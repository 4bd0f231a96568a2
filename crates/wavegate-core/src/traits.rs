use async_trait::async_trait;

use crate::checkpoint::GateReport;
use crate::{Result, Task};

/// Opaque collaborator that performs a task.
///
/// The scheduler never looks inside a worker; it only observes whether the
/// returned future resolves to success or failure.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Performs `task` and returns a short output summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the task could not be completed. The failure is
    /// contained to this task; sibling tasks keep running.
    async fn invoke(&self, task: &Task) -> Result<String>;
}

/// External check backing a quality gate.
#[async_trait]
pub trait GateCheck: Send + Sync {
    /// Runs the check and reports its tagged result.
    ///
    /// # Errors
    ///
    /// Returns an error if the check could not be executed at all; the gate is
    /// then recorded as failed.
    async fn check(&self) -> Result<GateReport>;

    /// Short description used in logs.
    fn describe(&self) -> String;
}
