//! Order record types for the fulfillment coordinator.
//!
//! The order is the only persisted entity. It is created implicitly by the
//! first upsert against its id and is never deleted by the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::FulfillmentAction;

/// Opaque reference to a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(pub String);

impl ExecutionHandle {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ExecutionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for ExecutionHandle {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Persisted fulfillment state of a single order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order. Immutable.
	pub order_id: String,
	/// Tenant (store/branch) the order belongs to. Opaque.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant_id: Option<String>,
	/// Customer who placed the order. Opaque.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_id: Option<String>,
	/// Order total as received. Kept verbatim.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total: Option<serde_json::Value>,
	/// Current status. Absent until the first transition is applied.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
	/// Append-only transition history.
	#[serde(default)]
	pub history: Vec<HistoryEntry>,
	/// Handle of the execution started for this order.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub execution_handle: Option<ExecutionHandle>,
	/// Present iff the execution is suspended waiting for a human checkpoint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pending_checkpoint: Option<PendingCheckpoint>,
	/// Timestamp of the last status transition.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
	/// Returns the pending checkpoint if the order is waiting at `step`.
	pub fn waiting_at(&self, step: &str) -> Option<&PendingCheckpoint> {
		self.pending_checkpoint
			.as_ref()
			.filter(|checkpoint| checkpoint.step_name == step)
	}
}

/// Resumable waiting point recorded when an execution suspends.
///
/// The token is optional so that a record left behind by a partial write can
/// still be read and rejected explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCheckpoint {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
	#[serde(default)]
	pub step_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub recorded_at: Option<DateTime<Utc>>,
}

impl PendingCheckpoint {
	pub fn new(token: impl Into<String>, step_name: impl Into<String>, now: DateTime<Utc>) -> Self {
		Self {
			token: Some(token.into()),
			step_name: step_name.into(),
			recorded_at: Some(now),
		}
	}
}

/// One record of the status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
	pub action: FulfillmentAction,
	pub status: OrderStatus,
	pub timestamp: DateTime<Utc>,
}

/// Fulfillment status of an order.
///
/// Serialized with the status names used by downstream dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
	#[serde(rename = "PENDIENTE")]
	Pending,
	#[serde(rename = "COCINANDO")]
	Cooking,
	#[serde(rename = "EMPACANDO")]
	Packing,
	#[serde(rename = "EN_REPARTO")]
	OnDelivery,
	#[serde(rename = "ENTREGADO")]
	Delivered,
}

impl OrderStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "PENDIENTE",
			OrderStatus::Cooking => "COCINANDO",
			OrderStatus::Packing => "EMPACANDO",
			OrderStatus::OnDelivery => "EN_REPARTO",
			OrderStatus::Delivered => "ENTREGADO",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
