//! Streaming of run events to reporting collaborators.

/// Unbounded run event channel.
pub mod channel;

pub use channel::EventChannel;
