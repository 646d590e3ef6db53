//! Order fulfillment coordinator.
//!
//! Starts one workflow execution per order, records where an execution is
//! suspended waiting for a human, resumes it once the right staff member
//! completes the right checkpoint, and keeps the order's status history in step
//! with the execution's progress.

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::{BuilderError, FulfillmentBuilder, FulfillmentFactories};
pub use engine::FulfillmentCoordinator;
pub use handlers::TransitionResult;

use fulfillment_types::{APIError, TransitionResponse, UnknownActionError};
use thiserror::Error;

/// Errors surfaced by coordinator operations.
///
/// Every collaborator failure is mapped to exactly one of these kinds; none is
/// swallowed.
#[derive(Debug, Error)]
pub enum CoordinatorError {
	/// Missing or empty input.
	#[error("Validation error: {0}")]
	Validation(String),
	/// The order does not exist.
	#[error("{0}")]
	NotFound(String),
	/// The order is not in a state that allows the request.
	#[error("{0}")]
	Conflict(String),
	/// The order store failed.
	#[error("Persist error: {0}")]
	Persist(String),
	/// The workflow engine failed or refused the request.
	#[error("Workflow engine error: {0}")]
	Engine(String),
	/// The action is not part of the lifecycle mapping.
	#[error(transparent)]
	UnknownAction(#[from] UnknownActionError),
	/// The transition was stored but its event could not be published.
	#[error("Transition applied but event publish failed: {message}")]
	Publish {
		message: String,
		applied: Box<TransitionResult>,
	},
}

impl From<CoordinatorError> for APIError {
	fn from(err: CoordinatorError) -> Self {
		let message = err.to_string();
		match err {
			CoordinatorError::Validation(_) => APIError::BadRequest {
				error_type: "VALIDATION_ERROR".to_string(),
				message,
			},
			CoordinatorError::NotFound(_) => APIError::NotFound {
				error_type: "ORDER_NOT_FOUND".to_string(),
				message,
			},
			CoordinatorError::Conflict(_) => APIError::Conflict {
				error_type: "CHECKPOINT_CONFLICT".to_string(),
				message,
			},
			CoordinatorError::Persist(_) => APIError::InternalServerError {
				error_type: "PERSIST_ERROR".to_string(),
				message,
			},
			CoordinatorError::Engine(_) => APIError::BadGateway {
				error_type: "WORKFLOW_ENGINE_ERROR".to_string(),
				message,
				details: None,
			},
			CoordinatorError::UnknownAction(_) => APIError::UnprocessableEntity {
				error_type: "UNKNOWN_ACTION".to_string(),
				message,
			},
			CoordinatorError::Publish { applied, .. } => APIError::BadGateway {
				error_type: "EVENT_PUBLISH_ERROR".to_string(),
				message,
				details: serde_json::to_value(TransitionResponse::from(*applied)).ok(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use fulfillment_types::OrderStatus;

	#[test]
	fn test_error_kinds_map_to_status_codes() {
		let cases = vec![
			(CoordinatorError::Validation("staff_id".into()), 400),
			(CoordinatorError::NotFound("Order not found".into()), 404),
			(CoordinatorError::Conflict("not waiting".into()), 409),
			(CoordinatorError::Persist("disk full".into()), 500),
			(CoordinatorError::Engine("token expired".into()), 502),
			(
				CoordinatorError::UnknownAction(UnknownActionError("REFUND".into())),
				422,
			),
		];

		for (err, status) in cases {
			assert_eq!(APIError::from(err).status_code(), status);
		}
	}

	#[test]
	fn test_publish_error_carries_applied_transition() {
		let err = CoordinatorError::Publish {
			message: "bus down".into(),
			applied: Box::new(TransitionResult {
				order_id: "O1".into(),
				status: OrderStatus::Cooking,
				timestamp: Utc::now(),
			}),
		};

		let api_error = APIError::from(err);
		assert_eq!(api_error.status_code(), 502);
		let response = api_error.to_error_response();
		assert_eq!(response.error, "EVENT_PUBLISH_ERROR");
		let details = response.details.unwrap();
		assert_eq!(details["order_id"], "O1");
		assert_eq!(details["status"], "COCINANDO");
	}
}
