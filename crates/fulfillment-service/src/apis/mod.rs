//! API adapters between the HTTP routes and the coordinator.

pub mod callbacks;
pub mod orders;
pub mod staff;

use axum::body::Bytes;
use fulfillment_types::APIError;
use serde::de::DeserializeOwned;

/// Parses a JSON request body. An empty body reads as `{}`.
pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, APIError> {
	let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
		b"{}"
	} else {
		body
	};

	serde_json::from_slice(raw).map_err(|e| APIError::BadRequest {
		error_type: "VALIDATION_ERROR".to_string(),
		message: format!("Invalid request body: {}", e),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_types::StaffCompletionRequest;

	#[test]
	fn test_empty_body_reads_as_empty_object() {
		let request: StaffCompletionRequest = parse_body(&Bytes::from_static(b"  ")).unwrap();
		assert!(request.staff_id.is_none());
		assert!(request.extra.is_empty());
	}

	#[test]
	fn test_malformed_body_is_bad_request() {
		let err = parse_body::<StaffCompletionRequest>(&Bytes::from_static(b"{staff")).unwrap_err();
		assert_eq!(err.status_code(), 400);
	}
}
