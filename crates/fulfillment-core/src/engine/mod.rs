//! Coordinator that owns the collaborator services and the handlers.

use crate::handlers::{
	CheckpointRecorder, CheckpointResolver, ExecutionLauncher, StatusUpdater, TransitionResult,
};
use crate::state::{OrderStateError, OrderStore};
use crate::CoordinatorError;
use fulfillment_config::Config;
use fulfillment_events::EventService;
use fulfillment_storage::StorageService;
use fulfillment_types::{
	CheckpointAck, CheckpointKind, ExecutionHandle, Order, OrderReceived, ResolveResponse,
	StaffCompletionRequest,
};
use fulfillment_workflow::WorkflowService;
use serde_json::Value;
use std::sync::Arc;

/// Order fulfillment coordinator.
///
/// Holds no mutable state of its own; everything shared lives in the order
/// store. Cloning is cheap and every clone drives the same collaborators.
#[derive(Clone)]
pub struct FulfillmentCoordinator {
	config: Config,
	orders: Arc<OrderStore>,
	events: Arc<EventService>,
	launcher: Arc<ExecutionLauncher>,
	recorder: Arc<CheckpointRecorder>,
	resolver: Arc<CheckpointResolver>,
	status_updater: Arc<StatusUpdater>,
}

impl FulfillmentCoordinator {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		workflow: Arc<WorkflowService>,
		events: Arc<EventService>,
	) -> Self {
		let orders = Arc::new(OrderStore::new(storage));

		Self {
			config,
			launcher: Arc::new(ExecutionLauncher::new(workflow.clone(), orders.clone())),
			recorder: Arc::new(CheckpointRecorder::new(orders.clone())),
			resolver: Arc::new(CheckpointResolver::new(workflow, orders.clone())),
			status_updater: Arc::new(StatusUpdater::new(orders.clone(), events.clone())),
			orders,
			events,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn orders(&self) -> &Arc<OrderStore> {
		&self.orders
	}

	pub fn events(&self) -> &Arc<EventService> {
		&self.events
	}

	/// Starts a fulfillment run for a received order.
	pub async fn start_fulfillment(
		&self,
		request: OrderReceived,
	) -> Result<ExecutionHandle, CoordinatorError> {
		self.launcher.start_fulfillment(request).await
	}

	/// Records that the execution for `order` is waiting at `step`.
	pub async fn record_checkpoint(
		&self,
		token: &str,
		step: &str,
		order: &Value,
	) -> Result<CheckpointAck, CoordinatorError> {
		self.recorder.record_checkpoint(token, step, order).await
	}

	/// Completes the checkpoint `kind` on behalf of a staff member.
	pub async fn resolve_checkpoint(
		&self,
		order_id: &str,
		kind: CheckpointKind,
		completion: StaffCompletionRequest,
	) -> Result<ResolveResponse, CoordinatorError> {
		self.resolver
			.resolve_checkpoint(order_id, kind, completion)
			.await
	}

	/// Applies a lifecycle action reported by the engine.
	pub async fn apply_transition(
		&self,
		action: &str,
		payload: &Value,
	) -> Result<TransitionResult, CoordinatorError> {
		self.status_updater.apply_transition(action, payload).await
	}

	/// Reads the current order record.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, CoordinatorError> {
		self.orders.get_order(order_id).await.map_err(|e| match e {
			OrderStateError::OrderNotFound(_) => CoordinatorError::NotFound("Order not found".into()),
			other => CoordinatorError::Persist(other.to_string()),
		})
	}
}
