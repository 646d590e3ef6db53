//! Registry of every collaborator implementation compiled into the binary.
//!
//! Implementations are collected once from each crate's
//! `get_all_implementations()` and handed to the builder by name.

use fulfillment_config::Config;
use fulfillment_core::{BuilderError, FulfillmentBuilder, FulfillmentCoordinator, FulfillmentFactories};
use fulfillment_events::EventSinkFactory;
use fulfillment_storage::StorageFactory;
use fulfillment_workflow::WorkflowFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Factories for every collaborator, keyed by implementation name.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub engine: HashMap<String, WorkflowFactory>,
	pub events: HashMap<String, EventSinkFactory>,
}

impl FactoryRegistry {
	fn new() -> Self {
		Self {
			storage: HashMap::new(),
			engine: HashMap::new(),
			events: HashMap::new(),
		}
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in fulfillment_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.storage.insert(name.to_string(), factory);
		}

		for (name, factory) in fulfillment_workflow::get_all_implementations() {
			tracing::debug!("Registering engine implementation: {}", name);
			registry.engine.insert(name.to_string(), factory);
		}

		for (name, factory) in fulfillment_events::get_all_implementations() {
			tracing::debug!("Registering event sink implementation: {}", name);
			registry.events.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Builds the coordinator from configuration using the registered factories.
pub fn build_coordinator(config: Config) -> Result<FulfillmentCoordinator, BuilderError> {
	let registry = initialize_registry();

	let factories = FulfillmentFactories {
		storage_factories: registry.storage.clone(),
		engine_factories: registry.engine.clone(),
		event_factories: registry.events.clone(),
	};

	FulfillmentBuilder::new(config).build(factories)
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_config::ConfigBuilder;

	#[test]
	fn test_registry_lists_every_backend() {
		let registry = initialize_registry();

		let mut storage: Vec<_> = registry.storage.keys().cloned().collect();
		storage.sort();
		assert_eq!(storage, vec!["file", "memory"]);

		let mut engine: Vec<_> = registry.engine.keys().cloned().collect();
		engine.sort();
		assert_eq!(engine, vec!["http", "memory"]);

		let mut events: Vec<_> = registry.events.keys().cloned().collect();
		events.sort();
		assert_eq!(events, vec!["broadcast", "memory"]);
	}

	#[test]
	fn test_build_with_file_storage() {
		let dir = tempfile::tempdir().unwrap();
		let mut table = toml::map::Map::new();
		table.insert(
			"storage_path".into(),
			toml::Value::String(dir.path().to_string_lossy().into_owned()),
		);
		let config = ConfigBuilder::new()
			.storage("file", toml::Value::Table(table))
			.build();

		assert!(build_coordinator(config).is_ok());
	}
}
