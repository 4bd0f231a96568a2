//! Declared-access analysis of task sets.
//!
//! Collision detection operates purely on the file operation sets tasks
//! declare; it never inspects real file state.

/// Per-path collision classification and aggregation
pub mod collision;

pub use collision::{CollisionDetector, detect_collisions};
