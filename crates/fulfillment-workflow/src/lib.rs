//! Workflow engine module for the fulfillment coordinator.
//!
//! The engine runs the fulfillment process graph. The coordinator only needs
//! two things from it: starting a named execution with an input payload, and
//! resuming a suspended execution by submitting the result for a task token.

use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ExecutionHandle, ImplementationRegistry};
use serde_json::Value;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur when talking to the workflow engine.
#[derive(Debug, Error)]
pub enum WorkflowError {
	/// The engine refused to start the execution.
	#[error("Execution rejected: {0}")]
	Rejected(String),
	/// The task token is unknown, expired or already consumed.
	#[error("Task token rejected: {0}")]
	TaskToken(String),
	/// The engine could not be reached or answered with garbage.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for workflow engines.
#[async_trait]
pub trait WorkflowInterface: Send + Sync {
	/// Starts an execution of `process_id` named `execution_name`.
	async fn start_execution(
		&self,
		process_id: &str,
		execution_name: &str,
		input: Value,
	) -> Result<ExecutionHandle, WorkflowError>;

	/// Resumes the execution suspended on `task_token` with `output`.
	///
	/// A token can be consumed once. Submitting it again fails with
	/// [`WorkflowError::TaskToken`].
	async fn send_task_success(&self, task_token: &str, output: Value) -> Result<(), WorkflowError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Factory signature every engine implementation provides.
pub type WorkflowFactory = fn(&toml::Value) -> Result<Box<dyn WorkflowInterface>, WorkflowError>;

/// Registry trait for workflow engine implementations.
pub trait WorkflowRegistry: ImplementationRegistry<Factory = WorkflowFactory> {}

/// Get all registered workflow engine implementations.
pub fn get_all_implementations() -> Vec<(&'static str, WorkflowFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service wrapping the configured workflow engine.
pub struct WorkflowService {
	engine: Box<dyn WorkflowInterface>,
	/// Identifier of the process graph executions are started from.
	process_id: String,
}

impl WorkflowService {
	pub fn new(engine: Box<dyn WorkflowInterface>, process_id: impl Into<String>) -> Self {
		Self {
			engine,
			process_id: process_id.into(),
		}
	}

	pub fn process_id(&self) -> &str {
		&self.process_id
	}

	/// Starts a new execution of the fulfillment process.
	pub async fn start_execution(
		&self,
		execution_name: &str,
		input: Value,
	) -> Result<ExecutionHandle, WorkflowError> {
		let handle = self
			.engine
			.start_execution(&self.process_id, execution_name, input)
			.await?;
		tracing::debug!(
			process_id = %self.process_id,
			execution = %execution_name,
			handle = %handle,
			"Execution started"
		);
		Ok(handle)
	}

	/// Submits the result of a suspended task.
	pub async fn send_task_success(&self, task_token: &str, output: Value) -> Result<(), WorkflowError> {
		self.engine.send_task_success(task_token, output).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryWorkflowEngine;
	use serde_json::json;

	#[tokio::test]
	async fn test_service_uses_configured_process() {
		let engine = MemoryWorkflowEngine::new();
		let service = WorkflowService::new(Box::new(engine.clone()), "order-fulfillment");

		let handle = service
			.start_execution("order-O1-1700000000", json!({ "order_id": "O1" }))
			.await
			.unwrap();

		let started = engine.started_executions().await;
		assert_eq!(started.len(), 1);
		assert_eq!(started[0].process_id, "order-fulfillment");
		assert_eq!(started[0].handle, handle);
		assert_eq!(service.process_id(), "order-fulfillment");
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["http", "memory"]);
	}
}
