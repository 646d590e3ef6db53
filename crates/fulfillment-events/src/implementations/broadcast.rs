//! In-process event bus backed by a tokio broadcast channel.
//!
//! Publishing with no live subscriber is not an error: the event is simply
//! not delivered to anyone.

use crate::{EventError, EventSinkInterface};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, Field, FieldType, FulfillmentEvent, Schema, ValidationError};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1000;

/// Broadcast-based event sink.
#[derive(Clone)]
pub struct BroadcastEventSink {
	sender: broadcast::Sender<FulfillmentEvent>,
}

impl BroadcastEventSink {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}
}

#[async_trait]
impl EventSinkInterface for BroadcastEventSink {
	async fn publish(&self, event: FulfillmentEvent) -> Result<(), EventError> {
		match self.sender.send(event) {
			Ok(receivers) => {
				tracing::trace!(receivers, "Event broadcast");
			},
			Err(broadcast::error::SendError(event)) => {
				tracing::debug!(detail_type = %event.detail_type, "No subscribers for event");
			},
		}
		Ok(())
	}

	fn subscribe(&self) -> Option<broadcast::Receiver<FulfillmentEvent>> {
		Some(self.sender.subscribe())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(BroadcastEventSinkSchema)
	}
}

/// Configuration schema for BroadcastEventSink.
pub struct BroadcastEventSinkSchema;

impl ConfigSchema for BroadcastEventSinkSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new(
				"capacity",
				FieldType::Integer {
					min: Some(1),
					max: Some(65_536),
				},
			)],
		)
		.validate(config)
	}
}

/// Factory function to create a broadcast sink from configuration.
///
/// Configuration parameters:
/// - `capacity`: events buffered per subscriber before lagging (default: 1000)
pub fn create_sink(config: &toml::Value) -> Result<Box<dyn EventSinkInterface>, EventError> {
	BroadcastEventSinkSchema
		.validate(config)
		.map_err(|e| EventError::Configuration(e.to_string()))?;

	let capacity = config
		.get("capacity")
		.and_then(|v| v.as_integer())
		.map(|v| v as usize)
		.unwrap_or(DEFAULT_CAPACITY);

	Ok(Box::new(BroadcastEventSink::new(capacity)))
}

/// Registry for the broadcast sink implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "broadcast";
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

	fn event(order_id: &str) -> FulfillmentEvent {
		FulfillmentEvent {
			source: "fulfillment.service".into(),
			detail_type: "RepartoIniciado".into(),
			detail: json!({ "order_id": order_id, "status": "EN_REPARTO" }),
		}
	}

	#[tokio::test]
	async fn test_subscribers_receive_events() {
		let sink = BroadcastEventSink::new(8);
		let mut first = sink.subscribe().unwrap();
		let mut second = sink.subscribe().unwrap();

		sink.publish(event("O1")).await.unwrap();

		assert_eq!(first.recv().await.unwrap().order_id(), Some("O1"));
		assert_eq!(second.recv().await.unwrap().order_id(), Some("O1"));
	}

	#[tokio::test]
	async fn test_publish_without_subscribers_succeeds() {
		let sink = BroadcastEventSink::new(8);
		assert!(sink.publish(event("O1")).await.is_ok());
	}

	#[test]
	fn test_capacity_bounds() {
		let zero: toml::Value = toml::from_str("capacity = 0").unwrap();
		assert!(create_sink(&zero).is_err());

		let ok: toml::Value = toml::from_str("capacity = 16").unwrap();
		assert!(create_sink(&ok).is_ok());
	}
}
