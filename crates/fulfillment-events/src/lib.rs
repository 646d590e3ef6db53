//! Event sink module for the fulfillment coordinator.
//!
//! Sinks are publish-only. The coordinator emits one event per applied status
//! transition; whatever consumes them lives outside this service.

use async_trait::async_trait;
use fulfillment_types::{
	ConfigSchema, FulfillmentAction, FulfillmentEvent, ImplementationRegistry, StatusChangedDetail,
};
use thiserror::Error;
use tokio::sync::broadcast::Receiver;

/// Re-export implementations
pub mod implementations {
	pub mod broadcast;
	pub mod memory;
}

/// Errors that can occur when publishing events.
#[derive(Debug, Error)]
pub enum EventError {
	/// The sink did not accept the event.
	#[error("Publish failed: {0}")]
	Publish(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for event sinks.
#[async_trait]
pub trait EventSinkInterface: Send + Sync {
	/// Publishes one event.
	async fn publish(&self, event: FulfillmentEvent) -> Result<(), EventError>;

	/// Returns a receiver for in-process delivery, for sinks that support it.
	fn subscribe(&self) -> Option<Receiver<FulfillmentEvent>> {
		None
	}

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Factory signature every sink implementation provides.
pub type EventSinkFactory = fn(&toml::Value) -> Result<Box<dyn EventSinkInterface>, EventError>;

/// Registry trait for event sink implementations.
pub trait EventSinkRegistry: ImplementationRegistry<Factory = EventSinkFactory> {}

/// Get all registered event sink implementations.
pub fn get_all_implementations() -> Vec<(&'static str, EventSinkFactory)> {
	use implementations::{broadcast, memory};

	vec![
		(broadcast::Registry::NAME, broadcast::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service publishing domain events under a fixed source.
pub struct EventService {
	sink: Box<dyn EventSinkInterface>,
	source: String,
}

impl EventService {
	pub fn new(sink: Box<dyn EventSinkInterface>, source: impl Into<String>) -> Self {
		Self {
			sink,
			source: source.into(),
		}
	}

	/// Source attached to every event published through this service.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Publishes an event with an arbitrary detail type and payload.
	pub async fn publish(
		&self,
		detail_type: impl Into<String>,
		detail: serde_json::Value,
	) -> Result<(), EventError> {
		self.sink
			.publish(FulfillmentEvent {
				source: self.source.clone(),
				detail_type: detail_type.into(),
				detail,
			})
			.await
	}

	/// Publishes the event announcing an applied status transition.
	pub async fn publish_status_changed(
		&self,
		action: FulfillmentAction,
		detail: &StatusChangedDetail,
	) -> Result<(), EventError> {
		let detail_type = action.event_type();
		tracing::debug!(
			detail_type,
			order_id = %detail.order_id,
			"Publishing status event"
		);
		let detail =
			serde_json::to_value(detail).map_err(|e| EventError::Publish(e.to_string()))?;
		self.publish(detail_type, detail).await
	}

	pub fn subscribe(&self) -> Option<Receiver<FulfillmentEvent>> {
		self.sink.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryEventSink;
	use chrono::Utc;
	use fulfillment_types::OrderStatus;

	#[tokio::test]
	async fn test_status_event_uses_configured_source() {
		let sink = MemoryEventSink::new();
		let service = EventService::new(Box::new(sink.clone()), "kitchen.tests");

		let detail = StatusChangedDetail {
			order_id: "O1".into(),
			status: OrderStatus::Packing,
			timestamp: Utc::now(),
		};
		service
			.publish_status_changed(FulfillmentAction::Packing, &detail)
			.await
			.unwrap();
		service
			.publish("Custom", serde_json::json!({ "order_id": "O1" }))
			.await
			.unwrap();

		let events = sink.events().await;
		assert_eq!(events.len(), 2);
		assert_eq!(events[0].source, "kitchen.tests");
		assert_eq!(events[0].detail_type, "EmpaqueIniciado");
		assert_eq!(events[0].detail["status"], "EMPACANDO");
		assert_eq!(events[1].detail_type, "Custom");
		assert!(service.subscribe().is_none());
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["broadcast", "memory"]);
	}
}
