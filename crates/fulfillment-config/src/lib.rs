//! Configuration module for the fulfillment coordinator.
//!
//! Configuration is loaded from TOML files. Each external collaborator
//! (storage, workflow engine, event sink) is configured as a `primary`
//! implementation name plus a table of implementation-specific settings.
//!
//! A file may split sections out with `include = ["api.toml"]`; each
//! top-level section must appear in exactly one file.
//!
//! Values may reference environment variables as `${VAR}` or
//! `${VAR:-default}`.

#[cfg(feature = "testing")]
pub mod builders;
mod loader;

#[cfg(feature = "testing")]
pub use builders::config::ConfigBuilder;

use fulfillment_types::DEFAULT_EVENT_SOURCE;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// A configuration file could not be read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The TOML is malformed or has the wrong shape.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// The values parsed but are not usable.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message; the default Display repeats the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the fulfillment coordinator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance and the process it drives.
	pub service: ServiceConfig,
	/// Order store backend.
	pub storage: StorageConfig,
	/// Workflow engine client.
	pub engine: EngineConfig,
	/// Event sink.
	pub events: EventsConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
	/// Identifier of the process graph executions are started for.
	pub process_id: String,
	/// Source attached to published events.
	#[serde(default = "default_event_source")]
	pub event_source: String,
}

fn default_event_source() -> String {
	DEFAULT_EVENT_SOURCE.to_string()
}

/// Configuration for the order store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Implementation the coordinator uses.
	pub primary: String,
	/// Implementation tables by name.
	pub implementations: HashMap<String, toml::Value>,
	/// How many times a field update is re-attempted after losing a
	/// concurrent write race on the same record.
	#[serde(default = "default_max_update_attempts")]
	pub max_update_attempts: u32,
}

/// Returns the default number of optimistic update attempts.
fn default_max_update_attempts() -> u32 {
	8
}

/// Configuration for the workflow engine client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Implementation the coordinator uses.
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the event sink.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
	/// Implementation the coordinator uses.
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// HTTP surface for order notifications, engine callbacks and staff requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Serve the API. Without it the service has no inbound triggers.
	#[serde(default)]
	pub enabled: bool,
	/// Bind address.
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Per-request timeout, seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Body size limit, bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration. Permissive when absent.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Substitutes `${VAR}` and `${VAR:-default}` references.
///
/// Fails on the first referenced variable that is unset and has no default.
/// Inputs over 1MB are rejected before matching.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match (std::env::var(var_name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(var_name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

		let file_name = path
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path.display())))?;

		let mut loader = loader::ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// Checks the parsed values.
	///
	/// - Service id and process id are not empty
	/// - Every collaborator section names a primary that is configured
	/// - Optimistic update attempts are within bounds
	/// - API settings are usable when the server is enabled
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}
		if self.service.process_id.is_empty() {
			return Err(ConfigError::Validation(
				"Service process_id cannot be empty".into(),
			));
		}
		if self.service.event_source.is_empty() {
			return Err(ConfigError::Validation(
				"Service event_source cannot be empty".into(),
			));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_primary("engine", &self.engine.primary, &self.engine.implementations)?;
		validate_primary("events", &self.events.primary, &self.events.implementations)?;

		if self.storage.max_update_attempts == 0 {
			return Err(ConfigError::Validation(
				"Storage max_update_attempts must be at least 1".into(),
			));
		}
		if self.storage.max_update_attempts > 100 {
			return Err(ConfigError::Validation(
				"Storage max_update_attempts cannot exceed 100".into(),
			));
		}

		if let Some(ref api) = self.api {
			if api.enabled {
				if api.port == 0 {
					return Err(ConfigError::Validation("API port cannot be 0".into()));
				}
				if api.timeout_seconds == 0 {
					return Err(ConfigError::Validation(
						"API timeout_seconds must be greater than 0".into(),
					));
				}
				if api.max_request_size == 0 {
					return Err(ConfigError::Validation(
						"API max_request_size must be greater than 0".into(),
					));
				}
			}
		}

		Ok(())
	}
}

/// Checks that a collaborator section has implementations and its primary is one of them.
fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
