pub mod gates;
/// Handoff descriptor checks.
pub mod handoff;
/// Sequential gate evaluation and checkpoint decisions.
pub mod pipeline;

use async_trait::async_trait;
use wavegate_core::{Checkpoint, CheckpointResult};

pub use gates::{CommandCheck, FnCheck, StaticCheck};
pub use handoff::validate_handoff;
pub use pipeline::CheckpointValidator;

/// Trait for checkpoint validation strategies
#[async_trait]
pub trait Validator: Send + Sync {
    /// Runs every gate and handoff check of `checkpoint` and decides the outcome.
    ///
    /// Gate failures, errors, and timeouts are recorded in the result; they
    /// never abort validation.
    async fn validate(&self, checkpoint: &Checkpoint) -> CheckpointResult;
}
