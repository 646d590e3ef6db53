//! Order endpoints: the order-received notification and order lookup.

use fulfillment_core::FulfillmentCoordinator;
use fulfillment_types::{APIError, LaunchResponse, OrderReceivedRequest, OrderResponse};
use tracing::warn;

/// Handles the order-received notification by starting a fulfillment run.
pub async fn launch_order(
	request: OrderReceivedRequest,
	coordinator: &FulfillmentCoordinator,
) -> Result<LaunchResponse, APIError> {
	let handle = coordinator
		.start_fulfillment(request.into_inner())
		.await
		.map_err(|e| {
			warn!("Order launch failed: {}", e);
			APIError::from(e)
		})?;

	Ok(LaunchResponse {
		message: "Fulfillment started".to_string(),
		execution_arn: handle.to_string(),
	})
}

/// Returns the stored order record without its checkpoint token.
pub async fn get_order_by_id(
	order_id: &str,
	coordinator: &FulfillmentCoordinator,
) -> Result<OrderResponse, APIError> {
	coordinator
		.get_order(order_id)
		.await
		.map(OrderResponse::from)
		.map_err(APIError::from)
}
