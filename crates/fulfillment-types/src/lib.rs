//! Common types module for the fulfillment coordinator.
//!
//! This module defines the core data types shared by every crate in the
//! workspace: the persisted order record, the closed action mapping, checkpoint
//! kinds, domain events, HTTP API types and configuration validation helpers.

/// Fulfillment actions and their status/event mapping.
pub mod action;
/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Human checkpoint kinds.
pub mod checkpoint;
/// Domain events published to the event sink.
pub mod events;
/// Persisted order record and its embedded values.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Storage namespaces and order document field names.
pub mod storage;
/// Utility functions for log formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use action::*;
pub use api::*;
pub use checkpoint::*;
pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use utils::truncate_id;
pub use validation::*;
