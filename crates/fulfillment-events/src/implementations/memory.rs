//! In-memory event sink that keeps every published event.

use crate::{EventError, EventSinkInterface};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, FulfillmentEvent, Schema, ValidationError};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct SinkState {
	events: Vec<FulfillmentEvent>,
	failure: Option<String>,
}

/// Event sink recording events in memory. Clones share the same record.
#[derive(Clone, Default)]
pub struct MemoryEventSink {
	state: Arc<RwLock<SinkState>>,
}

impl MemoryEventSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Events accepted so far, in publish order.
	pub async fn events(&self) -> Vec<FulfillmentEvent> {
		self.state.read().await.events.clone()
	}

	/// Makes subsequent publishes fail with `reason`, or succeed again with `None`.
	pub async fn fail_with(&self, reason: Option<String>) {
		self.state.write().await.failure = reason;
	}
}

#[async_trait]
impl EventSinkInterface for MemoryEventSink {
	async fn publish(&self, event: FulfillmentEvent) -> Result<(), EventError> {
		let mut state = self.state.write().await;
		if let Some(reason) = &state.failure {
			return Err(EventError::Publish(reason.clone()));
		}
		state.events.push(event);
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryEventSinkSchema)
	}
}

/// Configuration schema for MemoryEventSink.
pub struct MemoryEventSinkSchema;

impl ConfigSchema for MemoryEventSinkSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory event sink from configuration.
pub fn create_sink(config: &toml::Value) -> Result<Box<dyn EventSinkInterface>, EventError> {
	MemoryEventSinkSchema
		.validate(config)
		.map_err(|e| EventError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryEventSink::new()))
}

/// Registry for the memory sink implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::EventSinkFactory;

	fn factory() -> Self::Factory {
		create_sink
	}
}

impl crate::EventSinkRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn event(detail_type: &str) -> FulfillmentEvent {
		FulfillmentEvent {
			source: "fulfillment.service".into(),
			detail_type: detail_type.into(),
			detail: json!({ "order_id": "O1" }),
		}
	}

	#[tokio::test]
	async fn test_failure_toggle() {
		let sink = MemoryEventSink::new();
		sink.publish(event("PedidoInicializado")).await.unwrap();

		sink.fail_with(Some("bus unavailable".into())).await;
		let err = sink.publish(event("CocinaIniciada")).await.unwrap_err();
		assert!(err.to_string().contains("bus unavailable"));

		sink.fail_with(None).await;
		sink.publish(event("EmpaqueIniciado")).await.unwrap();

		let types: Vec<_> = sink
			.events()
			.await
			.into_iter()
			.map(|e| e.detail_type)
			.collect();
		assert_eq!(types, vec!["PedidoInicializado", "EmpaqueIniciado"]);
	}
}
