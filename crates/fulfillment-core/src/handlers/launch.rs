//! Execution launcher.
//!
//! Starts one workflow execution per received order and stores the returned
//! handle on the order.

use crate::state::OrderStore;
use crate::CoordinatorError;
use chrono::{DateTime, Utc};
use fulfillment_types::{truncate_id, ExecutionHandle, OrderReceived};
use fulfillment_workflow::WorkflowService;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// Name given to the execution started for `order_id` at `now`.
pub fn execution_name(order_id: &str, now: DateTime<Utc>) -> String {
	format!("order-{}-{}", order_id, now.timestamp())
}

/// Starts fulfillment runs.
pub struct ExecutionLauncher {
	workflow: Arc<WorkflowService>,
	orders: Arc<OrderStore>,
}

impl ExecutionLauncher {
	pub fn new(workflow: Arc<WorkflowService>, orders: Arc<OrderStore>) -> Self {
		Self { workflow, orders }
	}

	/// Starts the execution for a new order and persists its handle.
	///
	/// The order id is trimmed before it is used, like every other inbound id.
	///
	/// A store failure after a successful start is reported as
	/// [`CoordinatorError::Persist`] and not retried: the execution keeps
	/// running while the order has no handle recorded.
	#[instrument(skip_all, fields(order_id = %truncate_id(&request.order_id)))]
	pub async fn start_fulfillment(
		&self,
		mut request: OrderReceived,
	) -> Result<ExecutionHandle, CoordinatorError> {
		let order_id = request.order_id.trim();
		if order_id.is_empty() {
			return Err(CoordinatorError::Validation("order_id is required".into()));
		}
		request.order_id = order_id.to_string();

		let name = execution_name(&request.order_id, Utc::now());
		let input = json!({
			"order_id": request.order_id,
			"tenant_id": request.tenant_id,
			"customer_id": request.customer_id,
			"total": request.total,
		});

		let handle = self
			.workflow
			.start_execution(&name, input)
			.await
			.map_err(|e| {
				tracing::warn!(execution = %name, error = %e, "Workflow engine refused to start execution");
				CoordinatorError::Engine(e.to_string())
			})?;

		if let Err(e) = self.orders.record_launch(&request, &handle).await {
			tracing::error!(
				execution = %handle,
				error = %e,
				"Execution started but its handle could not be stored"
			);
			return Err(CoordinatorError::Persist(format!(
				"execution {} started but not recorded: {}",
				handle, e
			)));
		}

		tracing::info!(execution = %name, "Fulfillment started");
		Ok(handle)
	}
}
