//! Gate check adapters.
//!
//! Each adapter produces a tagged [`GateReport`](wavegate_core::GateReport);
//! judging the report against the gate kind happens in the validator.

/// External command checks.
pub mod command;
/// Fixed reports.
pub mod fixed;
/// Closure-backed checks.
pub mod function;

pub use command::CommandCheck;
pub use fixed::StaticCheck;
pub use function::FnCheck;
