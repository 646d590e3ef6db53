//! Status updater.
//!
//! Applies lifecycle transitions reported by the engine. There is no
//! transition graph here: the process graph decides the order of actions, and
//! re-applying an action simply records it again.

use crate::state::OrderStore;
use crate::CoordinatorError;
use chrono::{DateTime, Utc};
use fulfillment_events::EventService;
use fulfillment_types::{
	truncate_id, FulfillmentAction, HistoryEntry, OrderStatus, StatusChangedDetail,
	TransitionResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Outcome of an applied transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
	pub order_id: String,
	pub status: OrderStatus,
	pub timestamp: DateTime<Utc>,
}

impl From<TransitionResult> for TransitionResponse {
	fn from(result: TransitionResult) -> Self {
		TransitionResponse {
			order_id: result.order_id,
			status: result.status,
			ts: result.timestamp.to_rfc3339(),
		}
	}
}

/// Applies status transitions and announces them.
pub struct StatusUpdater {
	orders: Arc<OrderStore>,
	events: Arc<EventService>,
}

impl StatusUpdater {
	pub fn new(orders: Arc<OrderStore>, events: Arc<EventService>) -> Self {
		Self { orders, events }
	}

	/// Applies `action` to the order named in `payload`.
	///
	/// The status, `updated_at` and the new history entry are written in one
	/// atomic update, then one event is published. A publish failure leaves
	/// the transition applied and is reported as [`CoordinatorError::Publish`].
	#[instrument(skip_all, fields(action = %action))]
	pub async fn apply_transition(
		&self,
		action: &str,
		payload: &Value,
	) -> Result<TransitionResult, CoordinatorError> {
		let action: FulfillmentAction = action.parse()?;
		let order_id = payload
			.get("order_id")
			.and_then(Value::as_str)
			.map(str::trim)
			.filter(|id| !id.is_empty())
			.ok_or_else(|| CoordinatorError::Validation("payload.order_id is required".into()))?;

		let entry = HistoryEntry {
			action,
			status: action.status(),
			timestamp: Utc::now(),
		};
		self.orders
			.apply_transition(order_id, &entry)
			.await
			.map_err(|e| CoordinatorError::Persist(e.to_string()))?;

		let result = TransitionResult {
			order_id: order_id.to_string(),
			status: entry.status,
			timestamp: entry.timestamp,
		};
		tracing::info!(
			order_id = %truncate_id(order_id),
			status = %result.status,
			"Status updated"
		);

		let detail = StatusChangedDetail {
			order_id: result.order_id.clone(),
			status: result.status,
			timestamp: result.timestamp,
		};
		if let Err(e) = self.events.publish_status_changed(action, &detail).await {
			tracing::warn!(error = %e, "Transition stored but event was not published");
			return Err(CoordinatorError::Publish {
				message: e.to_string(),
				applied: Box::new(result),
			});
		}

		Ok(result)
	}
}
