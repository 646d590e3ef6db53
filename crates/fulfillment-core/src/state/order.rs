//! Order store built on the document storage service.

use fulfillment_storage::{DocumentUpdate, StorageError, StorageService};
use fulfillment_types::{
	ExecutionHandle, HistoryEntry, Order, OrderField, OrderReceived, PendingCheckpoint, StorageKey,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while reading or writing orders.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

/// Reads and updates order records.
pub struct OrderStore {
	storage: Arc<StorageService>,
}

fn field_value<T: Serialize>(value: &T) -> Result<Value, OrderStateError> {
	serde_json::to_value(value).map_err(|e| OrderStateError::Serialization(e.to_string()))
}

fn decode_order(
	order_id: &str,
	result: Result<Map<String, Value>, StorageError>,
) -> Result<Order, OrderStateError> {
	let document = result.map_err(|e| match e {
		StorageError::NotFound => OrderStateError::OrderNotFound(order_id.to_string()),
		other => OrderStateError::Storage(other.to_string()),
	})?;

	serde_json::from_value(Value::Object(document))
		.map_err(|e| OrderStateError::Serialization(e.to_string()))
}

impl OrderStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStateError> {
		match self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
		{
			Ok(order) => Ok(order),
			Err(StorageError::NotFound) => Err(OrderStateError::OrderNotFound(order_id.to_string())),
			Err(e) => Err(OrderStateError::Storage(e.to_string())),
		}
	}

	async fn apply(&self, order_id: &str, update: DocumentUpdate) -> Result<Order, OrderStateError> {
		let result = self
			.storage
			.apply(StorageKey::Orders.as_str(), order_id, &update)
			.await;
		decode_order(order_id, result)
	}

	/// Sets top-level fields, always carrying the key field so a record
	/// created by any writer is a readable order.
	async fn upsert(
		&self,
		order_id: &str,
		mut fields: Map<String, Value>,
	) -> Result<Order, OrderStateError> {
		fields.insert(
			OrderField::OrderId.as_str().to_string(),
			Value::String(order_id.to_string()),
		);
		let result = self
			.storage
			.upsert_fields(StorageKey::Orders.as_str(), order_id, fields)
			.await;
		decode_order(order_id, result)
	}

	/// Stores the execution handle and the passthrough fields of a launch.
	///
	/// Passthrough fields absent from the notification are left untouched.
	pub async fn record_launch(
		&self,
		request: &OrderReceived,
		handle: &ExecutionHandle,
	) -> Result<Order, OrderStateError> {
		let mut fields = Map::new();
		fields.insert(OrderField::ExecutionHandle.as_str().to_string(), field_value(handle)?);

		if let Some(tenant_id) = &request.tenant_id {
			fields.insert(OrderField::TenantId.as_str().to_string(), field_value(tenant_id)?);
		}
		if let Some(customer_id) = &request.customer_id {
			fields.insert(OrderField::CustomerId.as_str().to_string(), field_value(customer_id)?);
		}
		if let Some(total) = &request.total {
			fields.insert(OrderField::Total.as_str().to_string(), total.clone());
		}

		self.upsert(&request.order_id, fields).await
	}

	/// Replaces whatever checkpoint the order was waiting at.
	pub async fn set_pending_checkpoint(
		&self,
		order_id: &str,
		checkpoint: &PendingCheckpoint,
	) -> Result<Order, OrderStateError> {
		let mut fields = Map::new();
		fields.insert(
			OrderField::PendingCheckpoint.as_str().to_string(),
			field_value(checkpoint)?,
		);
		self.upsert(order_id, fields).await
	}

	/// Removes the pending checkpoint if it still holds `token`.
	///
	/// Returns `false` when the checkpoint was replaced or removed in the
	/// meantime; the record is then left as it is.
	pub async fn clear_pending_checkpoint(
		&self,
		order_id: &str,
		token: &str,
	) -> Result<bool, OrderStateError> {
		let field = OrderField::PendingCheckpoint.as_str();
		let update = DocumentUpdate::new()
			.when_equals(format!("{}.token", field), Value::String(token.to_string()))
			.remove(field);

		match self
			.storage
			.apply(StorageKey::Orders.as_str(), order_id, &update)
			.await
		{
			Ok(_) => Ok(true),
			Err(StorageError::ConditionFailed(reason)) => {
				tracing::debug!(%reason, "Pending checkpoint changed, not clearing");
				Ok(false)
			},
			Err(StorageError::NotFound) => Err(OrderStateError::OrderNotFound(order_id.to_string())),
			Err(e) => Err(OrderStateError::Storage(e.to_string())),
		}
	}

	/// Sets the status and appends the history entry in one atomic update.
	pub async fn apply_transition(
		&self,
		order_id: &str,
		entry: &HistoryEntry,
	) -> Result<Order, OrderStateError> {
		let update = DocumentUpdate::new()
			.set(OrderField::OrderId.as_str(), Value::String(order_id.to_string()))
			.set(OrderField::Status.as_str(), field_value(&entry.status)?)
			.set(OrderField::UpdatedAt.as_str(), field_value(&entry.timestamp)?)
			.add_to_set(OrderField::History.as_str(), field_value(entry)?);
		self.apply(order_id, update).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_types::{FulfillmentAction, OrderStatus};
	use serde_json::json;

	fn store() -> OrderStore {
		OrderStore::new(Arc::new(StorageService::new(
			Box::new(MemoryStorage::new()),
			8,
		)))
	}

	#[tokio::test]
	async fn test_writers_do_not_overwrite_each_other() {
		let orders = store();

		orders
			.set_pending_checkpoint("O1", &PendingCheckpoint::new("tok-1", "ASSIGN_COOK", Utc::now()))
			.await
			.unwrap();
		orders
			.record_launch(
				&OrderReceived {
					order_id: "O1".into(),
					tenant_id: Some("T1".into()),
					customer_id: None,
					total: Some(json!(42.5)),
				},
				&ExecutionHandle("exec-1".into()),
			)
			.await
			.unwrap();

		let order = orders.get_order("O1").await.unwrap();
		assert_eq!(order.tenant_id.as_deref(), Some("T1"));
		assert_eq!(order.total, Some(json!(42.5)));
		assert_eq!(order.execution_handle, Some(ExecutionHandle("exec-1".into())));
		assert_eq!(
			order.waiting_at("ASSIGN_COOK").and_then(|c| c.token.as_deref()),
			Some("tok-1")
		);
	}

	#[tokio::test]
	async fn test_clear_only_matching_token() {
		let orders = store();
		orders
			.set_pending_checkpoint("O1", &PendingCheckpoint::new("tok-2", "MARK_DELIVERED", Utc::now()))
			.await
			.unwrap();

		assert!(!orders.clear_pending_checkpoint("O1", "tok-1").await.unwrap());
		assert!(orders.get_order("O1").await.unwrap().pending_checkpoint.is_some());

		assert!(orders.clear_pending_checkpoint("O1", "tok-2").await.unwrap());
		assert!(orders.get_order("O1").await.unwrap().pending_checkpoint.is_none());

		assert!(matches!(
			orders.clear_pending_checkpoint("missing", "tok-2").await,
			Err(OrderStateError::OrderNotFound(_))
		));
	}

	#[tokio::test]
	async fn test_transitions_append_history() {
		let orders = store();

		for action in [FulfillmentAction::Init, FulfillmentAction::Cooking, FulfillmentAction::Cooking] {
			let entry = HistoryEntry {
				action,
				status: action.status(),
				timestamp: Utc::now(),
			};
			orders.apply_transition("O1", &entry).await.unwrap();
		}

		let order = orders.get_order("O1").await.unwrap();
		assert_eq!(order.status, Some(OrderStatus::Cooking));
		assert_eq!(order.history.len(), 3);
		assert_eq!(order.history[0].status, OrderStatus::Pending);
		assert_eq!(order.updated_at, Some(order.history[2].timestamp));
	}

	#[tokio::test]
	async fn test_missing_order() {
		assert!(matches!(
			store().get_order("nope").await,
			Err(OrderStateError::OrderNotFound(id)) if id == "nope"
		));
	}
}
