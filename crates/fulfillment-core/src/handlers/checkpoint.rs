//! Human checkpoint relay.
//!
//! The recorder stores the task token the engine hands out when it suspends.
//! The resolver later checks that the order is waiting at the step the staff
//! member claims to complete, resumes the engine with that token and clears
//! the stored checkpoint.

use crate::state::{OrderStateError, OrderStore};
use crate::CoordinatorError;
use chrono::{DateTime, Utc};
use fulfillment_types::{
	truncate_id, CheckpointAck, CheckpointKind, PendingCheckpoint, ResolveResponse,
	StaffCompletionRequest,
};
use fulfillment_workflow::WorkflowService;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

/// Records waiting points reported by the engine.
pub struct CheckpointRecorder {
	orders: Arc<OrderStore>,
}

impl CheckpointRecorder {
	pub fn new(orders: Arc<OrderStore>) -> Self {
		Self { orders }
	}

	/// Stores `token` as the order's pending checkpoint for `step`.
	///
	/// Any previous pending checkpoint is replaced. `order` is the payload the
	/// execution carries and must contain a non-empty `order_id`.
	#[instrument(skip_all, fields(step = %step))]
	pub async fn record_checkpoint(
		&self,
		token: &str,
		step: &str,
		order: &Value,
	) -> Result<CheckpointAck, CoordinatorError> {
		if token.trim().is_empty() {
			return Err(CoordinatorError::Validation("taskToken is required".into()));
		}
		if step.trim().is_empty() {
			return Err(CoordinatorError::Validation("step is required".into()));
		}
		let order_id = non_empty(order.get("order_id").and_then(Value::as_str))
			.ok_or_else(|| CoordinatorError::Validation("order.order_id is required".into()))?;

		if CheckpointKind::from_step(step).is_none() {
			tracing::warn!(step = %step, "No staff endpoint completes this step");
		}

		let checkpoint = PendingCheckpoint::new(token, step, Utc::now());
		self.orders
			.set_pending_checkpoint(order_id, &checkpoint)
			.await
			.map_err(|e| CoordinatorError::Persist(e.to_string()))?;

		tracing::info!(order_id = %truncate_id(order_id), "Execution waiting at checkpoint");
		Ok(CheckpointAck {
			status: "OK".to_string(),
			order_id: order_id.to_string(),
			step: step.to_string(),
		})
	}
}

/// Completes checkpoints on behalf of staff members.
pub struct CheckpointResolver {
	workflow: Arc<WorkflowService>,
	orders: Arc<OrderStore>,
}

/// Output submitted to the engine: the completion payload with the base
/// fields laid over it.
fn completion_output(
	order_id: &str,
	kind: CheckpointKind,
	staff_id: &str,
	staff_name: &str,
	extra: Map<String, Value>,
	now: DateTime<Utc>,
) -> Value {
	let mut output = extra;
	output.insert("order_id".into(), Value::String(order_id.to_string()));
	output.insert("staff_id".into(), Value::String(staff_id.to_string()));
	output.insert("staff_name".into(), Value::String(staff_name.to_string()));
	output.insert("step".into(), Value::String(kind.step_name().to_string()));
	output.insert("timestamp".into(), Value::String(now.to_rfc3339()));
	Value::Object(output)
}

impl CheckpointResolver {
	pub fn new(workflow: Arc<WorkflowService>, orders: Arc<OrderStore>) -> Self {
		Self { workflow, orders }
	}

	/// Resumes the execution waiting at `kind` for `order_id`.
	///
	/// The pending checkpoint is only cleared once the engine accepted the
	/// token. If the engine call fails the checkpoint stays, so the same
	/// request can be retried.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), step = %kind))]
	pub async fn resolve_checkpoint(
		&self,
		order_id: &str,
		kind: CheckpointKind,
		completion: StaffCompletionRequest,
	) -> Result<ResolveResponse, CoordinatorError> {
		let order_id = order_id.trim();
		let (Some(staff_id), Some(staff_name)) = (
			non_empty(completion.staff_id.as_deref()),
			non_empty(completion.staff_name.as_deref()),
		) else {
			return Err(CoordinatorError::Validation(
				"staff_id and staff_name are required".into(),
			));
		};

		let order = self.orders.get_order(order_id).await.map_err(|e| match e {
			OrderStateError::OrderNotFound(_) => CoordinatorError::NotFound("Order not found".into()),
			other => CoordinatorError::Persist(other.to_string()),
		})?;

		let checkpoint = order
			.waiting_at(kind.step_name())
			.ok_or_else(|| CoordinatorError::Conflict(kind.not_waiting_message().into()))?;
		let token = non_empty(checkpoint.token.as_deref())
			.ok_or_else(|| {
				CoordinatorError::Conflict("No pending task token for this order".into())
			})?
			.to_string();

		let output = completion_output(
			order_id,
			kind,
			staff_id,
			staff_name,
			completion.extra,
			Utc::now(),
		);

		self.workflow
			.send_task_success(&token, output)
			.await
			.map_err(|e| {
				tracing::warn!(error = %e, "Workflow engine did not accept checkpoint completion");
				CoordinatorError::Engine(e.to_string())
			})?;

		let cleared = self
			.orders
			.clear_pending_checkpoint(order_id, &token)
			.await
			.map_err(|e| {
				tracing::error!(error = %e, "Execution resumed but pending checkpoint was not cleared");
				CoordinatorError::Persist(format!(
					"execution resumed but checkpoint not cleared: {}",
					e
				))
			})?;
		if !cleared {
			tracing::info!("A newer checkpoint was recorded meanwhile, leaving it in place");
		}

		tracing::info!(staff_id = %staff_id, "Checkpoint completed");
		Ok(ResolveResponse {
			message: kind.completed_message().to_string(),
			order_id: order_id.to_string(),
		})
	}
}
