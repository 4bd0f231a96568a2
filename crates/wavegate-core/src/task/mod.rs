//! Task representation and declared file operations.
//!
//! Tasks are produced by an external planning component; the scheduler trusts
//! their dependency lists and file operation sets as declared.

mod core;
mod operations;

pub use core::*;
pub use operations::*;
