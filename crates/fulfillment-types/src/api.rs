//! API types for the fulfillment HTTP endpoints.
//!
//! Request bodies mirror the payloads sent by the inbound triggers: the
//! order-received notification, the workflow engine callbacks and the staff
//! checkpoint endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ExecutionHandle, HistoryEntry, Order, OrderStatus, PendingCheckpoint};

/// Order-received notification that starts a fulfillment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceived {
	pub order_id: String,
	#[serde(default)]
	pub tenant_id: Option<String>,
	#[serde(default)]
	pub customer_id: Option<String>,
	#[serde(default)]
	pub total: Option<serde_json::Value>,
}

/// Body of `POST /api/orders`.
///
/// Accepts the notification either bare or wrapped in an event-bus envelope
/// under `detail`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderReceivedRequest {
	Envelope { detail: OrderReceived },
	Bare(OrderReceived),
}

impl OrderReceivedRequest {
	pub fn into_inner(self) -> OrderReceived {
		match self {
			OrderReceivedRequest::Envelope { detail } => detail,
			OrderReceivedRequest::Bare(order) => order,
		}
	}
}

/// Response after a fulfillment run was started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchResponse {
	pub message: String,
	pub execution_arn: String,
}

/// Callback sent by the engine when it suspends at a human checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointCallback {
	#[serde(rename = "taskToken", default)]
	pub task_token: String,
	#[serde(default)]
	pub step: String,
	/// Order payload the execution was carrying; must contain `order_id`.
	#[serde(default)]
	pub order: serde_json::Value,
}

/// Acknowledgement returned to the engine once a checkpoint is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointAck {
	pub status: String,
	pub order_id: String,
	pub step: String,
}

/// Callback sent by the engine at a lifecycle point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCallback {
	/// Raw action name; validated against the closed mapping by the coordinator.
	pub action: String,
	#[serde(default)]
	pub payload: serde_json::Value,
}

/// Result of an applied status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResponse {
	pub order_id: String,
	pub status: OrderStatus,
	pub ts: String,
}

/// Body of the staff checkpoint endpoints.
///
/// Fields other than the staff identity are forwarded to the engine as part of
/// the completion output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffCompletionRequest {
	#[serde(default)]
	pub staff_id: Option<String>,
	#[serde(default)]
	pub staff_name: Option<String>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Order as returned by `GET /api/orders/{order_id}`.
///
/// The pending checkpoint is reduced to its step; its token only ever leaves
/// the service towards the workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
	pub order_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tenant_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub customer_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
	pub history: Vec<HistoryEntry>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub execution_handle: Option<ExecutionHandle>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pending_checkpoint: Option<PendingCheckpointView>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<DateTime<Utc>>,
}

/// Public view of a pending checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCheckpointView {
	pub step_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub recorded_at: Option<DateTime<Utc>>,
}

impl From<PendingCheckpoint> for PendingCheckpointView {
	fn from(checkpoint: PendingCheckpoint) -> Self {
		Self {
			step_name: checkpoint.step_name,
			recorded_at: checkpoint.recorded_at,
		}
	}
}

impl From<Order> for OrderResponse {
	fn from(order: Order) -> Self {
		Self {
			order_id: order.order_id,
			tenant_id: order.tenant_id,
			customer_id: order.customer_id,
			total: order.total,
			status: order.status,
			history: order.history,
			execution_handle: order.execution_handle,
			pending_checkpoint: order.pending_checkpoint.map(PendingCheckpointView::from),
			updated_at: order.updated_at,
		}
	}
}

/// Response after a checkpoint was resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
	pub message: String,
	pub order_id: String,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed or incomplete input (400)
	BadRequest { error_type: String, message: String },
	/// Unknown resource (404)
	NotFound { error_type: String, message: String },
	/// Request does not match the current state (409)
	Conflict { error_type: String, message: String },
	/// Well-formed request the service cannot process (422)
	UnprocessableEntity { error_type: String, message: String },
	/// An upstream collaborator failed (502)
	BadGateway {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::BadGateway { .. } => 502,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message, details) = match self {
			APIError::BadRequest { error_type, message }
			| APIError::NotFound { error_type, message }
			| APIError::Conflict { error_type, message }
			| APIError::UnprocessableEntity { error_type, message }
			| APIError::InternalServerError { error_type, message } => (error_type, message, None),
			APIError::BadGateway {
				error_type,
				message,
				details,
			} => (error_type, message, details.clone()),
		};

		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			details,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_order_received_accepts_envelope_and_bare() {
		let bare: OrderReceivedRequest = serde_json::from_value(json!({
			"order_id": "O1",
			"tenant_id": "T1",
			"total": 42.5
		}))
		.unwrap();
		let wrapped: OrderReceivedRequest = serde_json::from_value(json!({
			"detail": { "order_id": "O1", "tenant_id": "T1", "total": 42.5 }
		}))
		.unwrap();

		for request in [bare, wrapped] {
			let order = request.into_inner();
			assert_eq!(order.order_id, "O1");
			assert_eq!(order.tenant_id.as_deref(), Some("T1"));
			assert!(order.customer_id.is_none());
			assert_eq!(order.total, Some(json!(42.5)));
		}
	}

	#[test]
	fn test_staff_request_keeps_extra_fields() {
		let request: StaffCompletionRequest = serde_json::from_value(json!({
			"staff_id": "S1",
			"staff_name": "Ana",
			"station": "grill"
		}))
		.unwrap();

		assert_eq!(request.staff_id.as_deref(), Some("S1"));
		assert_eq!(request.extra.get("station"), Some(&json!("grill")));
		assert!(!request.extra.contains_key("staff_id"));
	}

	#[test]
	fn test_checkpoint_callback_uses_engine_field_names() {
		let callback: CheckpointCallback = serde_json::from_value(json!({
			"taskToken": "tok-1",
			"step": "ASSIGN_COOK",
			"order": { "order_id": "O1" }
		}))
		.unwrap();

		assert_eq!(callback.task_token, "tok-1");
		assert_eq!(callback.order["order_id"], "O1");
	}

	#[test]
	fn test_order_response_hides_checkpoint_token() {
		let order = Order {
			order_id: "O1".into(),
			tenant_id: Some("T1".into()),
			customer_id: None,
			total: None,
			status: None,
			history: Vec::new(),
			execution_handle: None,
			pending_checkpoint: Some(PendingCheckpoint::new("tok-1", "ASSIGN_COOK", Utc::now())),
			updated_at: None,
		};

		let body = serde_json::to_value(OrderResponse::from(order)).unwrap();
		assert_eq!(body["pending_checkpoint"]["step_name"], "ASSIGN_COOK");
		assert!(body["pending_checkpoint"]["recorded_at"].is_string());
		assert!(body["pending_checkpoint"].get("token").is_none());
		assert_eq!(body["tenant_id"], "T1");
	}

	#[test]
	fn test_error_status_codes() {
		let err = APIError::Conflict {
			error_type: "CHECKPOINT_MISMATCH".into(),
			message: "not waiting".into(),
		};
		assert_eq!(err.status_code(), 409);
		assert_eq!(err.to_error_response().error, "CHECKPOINT_MISMATCH");
		assert!(err.to_error_response().details.is_none());
	}
}
