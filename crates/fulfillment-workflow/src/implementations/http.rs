//! HTTP client for a remote workflow engine.
//!
//! Endpoints, relative to `base_url`:
//! - `POST /executions` with `{process_id, name, input}`, answering
//!   `{execution_handle}`.
//! - `POST /tasks/success` with `{task_token, output}`. `400`, `404` and `410`
//!   mean the token is not (or no longer) valid.

use crate::{WorkflowError, WorkflowInterface};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ExecutionHandle, Field, FieldType, Schema, ValidationError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct StartExecutionRequest<'a> {
	process_id: &'a str,
	name: &'a str,
	input: Value,
}

#[derive(Debug, Deserialize)]
struct StartExecutionResponse {
	#[serde(alias = "executionArn")]
	execution_handle: String,
}

#[derive(Debug, Serialize)]
struct TaskSuccessRequest<'a> {
	task_token: &'a str,
	output: Value,
}

/// Workflow engine reached over HTTP.
pub struct HttpWorkflowEngine {
	client: reqwest::Client,
	base_url: String,
}

impl HttpWorkflowEngine {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WorkflowError> {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(timeout)
			.build()
			.map_err(|e| WorkflowError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response, WorkflowError> {
		let url = format!("{}{}", self.base_url, path);
		self.client
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(|e| WorkflowError::Network(format!("POST {} failed: {}", url, e)))
	}
}

async fn error_body(response: reqwest::Response) -> String {
	let status = response.status();
	match response.text().await {
		Ok(body) if !body.is_empty() => format!("{}: {}", status, body),
		_ => status.to_string(),
	}
}

#[async_trait]
impl WorkflowInterface for HttpWorkflowEngine {
	async fn start_execution(
		&self,
		process_id: &str,
		execution_name: &str,
		input: Value,
	) -> Result<ExecutionHandle, WorkflowError> {
		let request = StartExecutionRequest {
			process_id,
			name: execution_name,
			input,
		};
		let response = self.post("/executions", &request).await?;

		if response.status().is_server_error() {
			return Err(WorkflowError::Network(error_body(response).await));
		}
		if !response.status().is_success() {
			return Err(WorkflowError::Rejected(error_body(response).await));
		}

		let body: StartExecutionResponse = response
			.json()
			.await
			.map_err(|e| WorkflowError::Network(format!("Invalid start response: {}", e)))?;
		Ok(ExecutionHandle(body.execution_handle))
	}

	async fn send_task_success(&self, task_token: &str, output: Value) -> Result<(), WorkflowError> {
		let request = TaskSuccessRequest { task_token, output };
		let response = self.post("/tasks/success", &request).await?;

		match response.status() {
			status if status.is_success() => Ok(()),
			StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::GONE => {
				Err(WorkflowError::TaskToken(error_body(response).await))
			},
			_ => Err(WorkflowError::Network(error_body(response).await)),
		}
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpWorkflowSchema)
	}
}

/// Configuration schema for the HTTP engine client.
pub struct HttpWorkflowSchema;

impl ConfigSchema for HttpWorkflowSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("base_url must be an http(s) URL".into()),
				}
			})],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP engine client from configuration.
///
/// Configuration parameters:
/// - `base_url`: engine API root (required)
/// - `timeout_seconds`: request timeout (default: 10)
pub fn create_engine(config: &toml::Value) -> Result<Box<dyn WorkflowInterface>, WorkflowError> {
	HttpWorkflowSchema
		.validate(config)
		.map_err(|e| WorkflowError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| WorkflowError::Configuration("base_url is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as u64;

	Ok(Box::new(HttpWorkflowEngine::new(
		base_url,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the HTTP engine implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::WorkflowFactory;

	fn factory() -> Self::Factory {
		create_engine
	}
}

impl crate::WorkflowRegistry for Registry {}
