//! Builder pattern for constructing the fulfillment coordinator.
//!
//! Collaborator implementations are looked up by name in factory maps and
//! created from their configuration tables. Only the `primary` implementation
//! of each section is used; the others are still created so that a broken
//! table is reported at startup.

use crate::engine::FulfillmentCoordinator;
use fulfillment_config::Config;
use fulfillment_events::{EventError, EventService, EventSinkInterface};
use fulfillment_storage::{StorageError, StorageInterface, StorageService};
use fulfillment_workflow::{WorkflowError, WorkflowInterface, WorkflowService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building the coordinator.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory maps for every collaborator, keyed by implementation name.
pub struct FulfillmentFactories<SF, WF, EF> {
	pub storage_factories: HashMap<String, SF>,
	pub engine_factories: HashMap<String, WF>,
	pub event_factories: HashMap<String, EF>,
}

/// Builder for constructing a FulfillmentCoordinator with pluggable implementations.
pub struct FulfillmentBuilder {
	config: Config,
}

/// Creates every configured implementation that has a factory and returns
/// the primary one.
fn load_primary<T: ?Sized, E: Display, F>(
	component: &'static str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	if !factories.contains_key(primary) {
		return Err(BuilderError::MissingComponent(format!(
			"No {} implementation named '{}'",
			component, primary
		)));
	}

	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "Unknown implementation, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = name == primary;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' has no configuration table",
			component, primary
		))
	})
}

impl FulfillmentBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the coordinator using the given factories.
	pub fn build<SF, WF, EF>(
		self,
		factories: FulfillmentFactories<SF, WF, EF>,
	) -> Result<FulfillmentCoordinator, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		WF: Fn(&toml::Value) -> Result<Box<dyn WorkflowInterface>, WorkflowError>,
		EF: Fn(&toml::Value) -> Result<Box<dyn EventSinkInterface>, EventError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(
			storage_backend,
			self.config.storage.max_update_attempts,
		));

		let engine = load_primary(
			"engine",
			&self.config.engine.primary,
			&self.config.engine.implementations,
			&factories.engine_factories,
		)?;
		let workflow = Arc::new(WorkflowService::new(
			engine,
			self.config.service.process_id.clone(),
		));

		let sink = load_primary(
			"events",
			&self.config.events.primary,
			&self.config.events.implementations,
			&factories.event_factories,
		)?;
		let events = Arc::new(EventService::new(
			sink,
			self.config.service.event_source.clone(),
		));

		Ok(FulfillmentCoordinator::new(
			self.config,
			storage,
			workflow,
			events,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_config::ConfigBuilder;
	use fulfillment_events::EventSinkFactory;
	use fulfillment_storage::StorageFactory;
	use fulfillment_workflow::WorkflowFactory;
	use serde_json::json;

	fn all_factories(
	) -> FulfillmentFactories<StorageFactory, WorkflowFactory, EventSinkFactory> {
		FulfillmentFactories {
			storage_factories: fulfillment_storage::get_all_implementations()
				.into_iter()
				.map(|(name, f)| (name.to_string(), f))
				.collect(),
			engine_factories: fulfillment_workflow::get_all_implementations()
				.into_iter()
				.map(|(name, f)| (name.to_string(), f))
				.collect(),
			event_factories: fulfillment_events::get_all_implementations()
				.into_iter()
				.map(|(name, f)| (name.to_string(), f))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_build_with_memory_collaborators() {
		let config = ConfigBuilder::new()
			.events("broadcast", toml::from_str("capacity = 4").unwrap())
			.build();
		let coordinator = FulfillmentBuilder::new(config).build(all_factories()).unwrap();

		let mut events = coordinator.events().subscribe().unwrap();
		coordinator
			.apply_transition("INIT", &json!({ "order_id": "O1" }))
			.await
			.unwrap();

		let event = events.recv().await.unwrap();
		assert_eq!(event.detail_type, "PedidoInicializado");
		assert_eq!(coordinator.config().service.process_id, "order-fulfillment");
	}

	#[test]
	fn test_unknown_primary_is_rejected() {
		let config = ConfigBuilder::new()
			.engine("stepfunctions", toml::Value::Table(Default::default()))
			.build();
		let err = FulfillmentBuilder::new(config)
			.build(all_factories())
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(_)));
	}

	#[test]
	fn test_invalid_implementation_table_fails_build() {
		let config = ConfigBuilder::new()
			.engine("http", toml::from_str("timeout_seconds = 5").unwrap())
			.build();
		let err = FulfillmentBuilder::new(config)
			.build(all_factories())
			.err()
			.unwrap();
		assert!(err.to_string().contains("base_url"));
	}
}
