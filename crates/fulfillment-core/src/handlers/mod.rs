//! Entry points of the coordinator.
//!
//! Each handler serves one trigger: the order-received notification, the
//! engine's suspension callback, a staff member completing a checkpoint, and
//! the engine's lifecycle callbacks.

pub mod checkpoint;
pub mod launch;
pub mod status;

pub use checkpoint::{CheckpointRecorder, CheckpointResolver};
pub use launch::ExecutionLauncher;
pub use status::{StatusUpdater, TransitionResult};
