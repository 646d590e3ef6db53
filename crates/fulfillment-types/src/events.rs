//! Domain events published by the coordinator.
//!
//! Events follow an envelope of `source`, `detail_type` and a JSON `detail`,
//! so that sinks can forward them without knowing every payload shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OrderStatus;

/// Default source attached to events emitted by this service.
pub const DEFAULT_EVENT_SOURCE: &str = "fulfillment.service";

/// Envelope accepted by every event sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentEvent {
	/// Emitting service.
	pub source: String,
	/// Event type consumers filter on (e.g. "CocinaIniciada").
	pub detail_type: String,
	/// Event payload.
	pub detail: serde_json::Value,
}

/// Payload of a status transition event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangedDetail {
	pub order_id: String,
	pub status: OrderStatus,
	pub timestamp: DateTime<Utc>,
}

impl FulfillmentEvent {
	/// Order id carried in the detail, if any.
	pub fn order_id(&self) -> Option<&str> {
		self.detail.get("order_id").and_then(|v| v.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_detail_wire_shape() {
		let detail = StatusChangedDetail {
			order_id: "O1".into(),
			status: OrderStatus::Cooking,
			timestamp: Utc::now(),
		};
		let event = FulfillmentEvent {
			source: DEFAULT_EVENT_SOURCE.to_string(),
			detail_type: "CocinaIniciada".to_string(),
			detail: serde_json::to_value(&detail).unwrap(),
		};

		assert_eq!(event.order_id(), Some("O1"));
		assert_eq!(event.detail["status"], "COCINANDO");
		assert!(event.detail["timestamp"].is_string());
	}
}
