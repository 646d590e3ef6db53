//! In-process workflow engine.
//!
//! Keeps started executions, issued task tokens and submitted task results in
//! memory. The handle is cheap to clone and all clones share state, so a test
//! can keep one clone for inspection while the coordinator owns another.

use crate::{WorkflowError, WorkflowInterface};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ExecutionHandle, Field, FieldType, Schema, ValidationError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An execution started on the memory engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedExecution {
	pub process_id: String,
	pub name: String,
	pub input: Value,
	pub handle: ExecutionHandle,
}

/// A task result accepted by the memory engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCompletion {
	pub task_token: String,
	pub output: Value,
}

#[derive(Default)]
struct EngineState {
	executions: Vec<StartedExecution>,
	/// Issued tokens and the execution they suspend, if known.
	issued: HashMap<String, Option<ExecutionHandle>>,
	consumed: HashSet<String>,
	completions: Vec<TaskCompletion>,
	reject_starts: Option<String>,
	reject_tasks: Option<String>,
}

/// In-memory workflow engine.
#[derive(Clone, Default)]
pub struct MemoryWorkflowEngine {
	state: Arc<RwLock<EngineState>>,
	/// Only accept tokens handed out by [`MemoryWorkflowEngine::issue_task_token`].
	require_issued_tokens: bool,
}

impl MemoryWorkflowEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an engine that rejects tokens it did not issue.
	pub fn strict() -> Self {
		Self {
			require_issued_tokens: true,
			..Self::default()
		}
	}

	/// Suspends an execution and returns the token that resumes it.
	pub async fn issue_task_token(&self, execution: Option<&ExecutionHandle>) -> String {
		let token = format!("task-{}", uuid::Uuid::new_v4());
		self.state
			.write()
			.await
			.issued
			.insert(token.clone(), execution.cloned());
		token
	}

	/// Makes every subsequent start fail with `reason`.
	pub async fn reject_starts(&self, reason: impl Into<String>) {
		self.state.write().await.reject_starts = Some(reason.into());
	}

	/// Makes every subsequent task submission fail with `reason` until cleared.
	pub async fn reject_tasks(&self, reason: Option<String>) {
		self.state.write().await.reject_tasks = reason;
	}

	pub async fn started_executions(&self) -> Vec<StartedExecution> {
		self.state.read().await.executions.clone()
	}

	pub async fn completions(&self) -> Vec<TaskCompletion> {
		self.state.read().await.completions.clone()
	}
}

#[async_trait]
impl WorkflowInterface for MemoryWorkflowEngine {
	async fn start_execution(
		&self,
		process_id: &str,
		execution_name: &str,
		input: Value,
	) -> Result<ExecutionHandle, WorkflowError> {
		let mut state = self.state.write().await;

		if let Some(reason) = &state.reject_starts {
			return Err(WorkflowError::Rejected(reason.clone()));
		}
		if state.executions.iter().any(|e| e.name == execution_name) {
			return Err(WorkflowError::Rejected(format!(
				"Execution '{}' already exists",
				execution_name
			)));
		}

		let handle = ExecutionHandle(format!(
			"memory:execution:{}:{}",
			process_id, execution_name
		));
		state.executions.push(StartedExecution {
			process_id: process_id.to_string(),
			name: execution_name.to_string(),
			input,
			handle: handle.clone(),
		});

		Ok(handle)
	}

	async fn send_task_success(&self, task_token: &str, output: Value) -> Result<(), WorkflowError> {
		let mut state = self.state.write().await;

		if let Some(reason) = &state.reject_tasks {
			return Err(WorkflowError::Network(reason.clone()));
		}
		if state.consumed.contains(task_token) {
			return Err(WorkflowError::TaskToken(format!(
				"Task token '{}' was already used",
				task_token
			)));
		}
		if self.require_issued_tokens && !state.issued.contains_key(task_token) {
			return Err(WorkflowError::TaskToken(format!(
				"Task token '{}' is unknown",
				task_token
			)));
		}

		state.consumed.insert(task_token.to_string());
		state.completions.push(TaskCompletion {
			task_token: task_token.to_string(),
			output,
		});

		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryWorkflowSchema)
	}
}

/// Configuration schema for the memory engine.
pub struct MemoryWorkflowSchema;

impl ConfigSchema for MemoryWorkflowSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("require_issued_tokens", FieldType::Boolean)],
		)
		.validate(config)
	}
}

/// Factory function to create a memory engine from configuration.
///
/// Configuration parameters:
/// - `require_issued_tokens`: reject tokens not issued by this engine (default: false)
pub fn create_engine(config: &toml::Value) -> Result<Box<dyn WorkflowInterface>, WorkflowError> {
	MemoryWorkflowSchema
		.validate(config)
		.map_err(|e| WorkflowError::Configuration(e.to_string()))?;

	let strict = config
		.get("require_issued_tokens")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);

	Ok(Box::new(if strict {
		MemoryWorkflowEngine::strict()
	} else {
		MemoryWorkflowEngine::new()
	}))
}

/// Registry for the memory engine implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::WorkflowFactory;

	fn factory() -> Self::Factory {
		create_engine
	}
}

impl crate::WorkflowRegistry for Registry {}
