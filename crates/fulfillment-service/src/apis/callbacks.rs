//! Callbacks invoked by the workflow engine.

use fulfillment_core::FulfillmentCoordinator;
use fulfillment_types::{APIError, CheckpointAck, CheckpointCallback, StatusCallback, TransitionResponse};
use tracing::warn;

/// The execution suspended at a human checkpoint.
pub async fn record_checkpoint(
	callback: CheckpointCallback,
	coordinator: &FulfillmentCoordinator,
) -> Result<CheckpointAck, APIError> {
	coordinator
		.record_checkpoint(&callback.task_token, &callback.step, &callback.order)
		.await
		.map_err(|e| {
			warn!("Checkpoint callback rejected: {}", e);
			APIError::from(e)
		})
}

/// The execution reached a lifecycle point.
pub async fn apply_status(
	callback: StatusCallback,
	coordinator: &FulfillmentCoordinator,
) -> Result<TransitionResponse, APIError> {
	coordinator
		.apply_transition(&callback.action, &callback.payload)
		.await
		.map(TransitionResponse::from)
		.map_err(|e| {
			warn!("Status callback failed: {}", e);
			APIError::from(e)
		})
}
