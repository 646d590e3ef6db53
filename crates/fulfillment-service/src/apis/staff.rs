//! Staff checkpoint endpoints.
//!
//! Each endpoint completes exactly one kind of checkpoint; a staff member
//! calling the wrong one gets a conflict and the execution stays suspended.

use fulfillment_core::FulfillmentCoordinator;
use fulfillment_types::{APIError, CheckpointKind, ResolveResponse, StaffCompletionRequest};
use tracing::warn;

pub async fn resolve(
	order_id: &str,
	kind: CheckpointKind,
	request: StaffCompletionRequest,
	coordinator: &FulfillmentCoordinator,
) -> Result<ResolveResponse, APIError> {
	coordinator
		.resolve_checkpoint(order_id, kind, request)
		.await
		.map_err(|e| {
			warn!(checkpoint = %kind, "Checkpoint resolution failed: {}", e);
			APIError::from(e)
		})
}
