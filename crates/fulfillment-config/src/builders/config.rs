//! Configuration builder for creating test and development configurations.
//!
//! Produces a valid [`Config`] wired to the in-memory collaborators unless
//! told otherwise.

use crate::{
	ApiConfig, Config, EngineConfig, EventsConfig, ServiceConfig, StorageConfig,
};
use fulfillment_types::DEFAULT_EVENT_SOURCE;
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	process_id: String,
	event_source: String,
	storage_primary: String,
	storage_config: toml::Value,
	max_update_attempts: u32,
	engine_primary: String,
	engine_config: toml::Value,
	events_primary: String,
	events_config: toml::Value,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

impl ConfigBuilder {
	/// Creates a builder using the `memory` implementation of every collaborator.
	pub fn new() -> Self {
		Self {
			service_id: "test-fulfillment".to_string(),
			process_id: "order-fulfillment".to_string(),
			event_source: DEFAULT_EVENT_SOURCE.to_string(),
			storage_primary: "memory".to_string(),
			storage_config: empty_table(),
			max_update_attempts: 8,
			engine_primary: "memory".to_string(),
			engine_config: empty_table(),
			events_primary: "memory".to_string(),
			events_config: empty_table(),
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn process_id(mut self, process_id: impl Into<String>) -> Self {
		self.process_id = process_id.into();
		self
	}

	pub fn event_source(mut self, source: impl Into<String>) -> Self {
		self.event_source = source.into();
		self
	}

	/// Selects the storage implementation and its table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	pub fn max_update_attempts(mut self, attempts: u32) -> Self {
		self.max_update_attempts = attempts;
		self
	}

	/// Selects the workflow engine implementation and its table.
	pub fn engine(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.engine_primary = primary.into();
		self.engine_config = config;
		self
	}

	/// Selects the event sink implementation and its table.
	pub fn events(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.events_primary = primary.into();
		self.events_config = config;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the final `Config`.
	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
				process_id: self.process_id,
				event_source: self.event_source,
			},
			storage: StorageConfig {
				implementations: HashMap::from([(self.storage_primary.clone(), self.storage_config)]),
				primary: self.storage_primary,
				max_update_attempts: self.max_update_attempts,
			},
			engine: EngineConfig {
				implementations: HashMap::from([(self.engine_primary.clone(), self.engine_config)]),
				primary: self.engine_primary,
			},
			events: EventsConfig {
				implementations: HashMap::from([(self.events_primary.clone(), self.events_config)]),
				primary: self.events_primary,
			},
			api: self.api,
		}
	}
}
