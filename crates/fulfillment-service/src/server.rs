//! HTTP server for the fulfillment API.
//!
//! Routes the inbound triggers (order notifications, engine callbacks and
//! staff checkpoint requests) to the coordinator.

use crate::apis::{self, parse_body};
use axum::{
	body::Bytes,
	extract::{Path, State},
	http::{HeaderValue, Method, StatusCode},
	response::Json,
	routing::{get, post},
	Router,
};
use fulfillment_config::ApiConfig;
use fulfillment_core::FulfillmentCoordinator;
use fulfillment_types::{
	APIError, CheckpointAck, CheckpointKind, LaunchResponse, OrderResponse, ResolveResponse,
	TransitionResponse,
};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	limit::RequestBodyLimitLayer,
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub coordinator: FulfillmentCoordinator,
}

/// Builds the router with every route and middleware layer.
pub fn router(api_config: &ApiConfig, coordinator: FulfillmentCoordinator) -> Router {
	let api = Router::new()
		.route("/orders", post(handle_launch))
		.route("/orders/{order_id}", get(handle_get_order))
		.route("/orders/{order_id}/assign-cook", post(handle_assign_cook))
		.route("/orders/{order_id}/mark-delivered", post(handle_mark_delivered))
		.route("/callbacks/checkpoints", post(handle_checkpoint_callback))
		.route("/callbacks/status", post(handle_status_callback));

	Router::new()
		.nest("/api", api)
		.route("/health", get(handle_health))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(RequestBodyLimitLayer::new(api_config.max_request_size))
				.layer(cors_layer(api_config))
				.layer(TimeoutLayer::with_status_code(
					StatusCode::REQUEST_TIMEOUT,
					Duration::from_secs(api_config.timeout_seconds),
				)),
		)
		.with_state(AppState { coordinator })
}

fn cors_layer(api_config: &ApiConfig) -> CorsLayer {
	let Some(cors) = &api_config.cors else {
		return CorsLayer::permissive();
	};

	let origins: Vec<HeaderValue> = cors
		.allowed_origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin) {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods([Method::GET, Method::POST])
		.allow_headers(Any)
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	coordinator: FulfillmentCoordinator,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, coordinator);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Fulfillment API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/orders requests.
async fn handle_launch(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<LaunchResponse>, APIError> {
	let request = parse_body(&body)?;
	apis::orders::launch_order(request, &state.coordinator)
		.await
		.map(Json)
}

/// Handles GET /api/orders/{order_id} requests.
async fn handle_get_order(
	Path(order_id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::orders::get_order_by_id(&order_id, &state.coordinator)
		.await
		.map(Json)
}

/// Handles POST /api/orders/{order_id}/assign-cook requests.
async fn handle_assign_cook(
	Path(order_id): Path<String>,
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<ResolveResponse>, APIError> {
	let request = parse_body(&body)?;
	apis::staff::resolve(&order_id, CheckpointKind::AssignCook, request, &state.coordinator)
		.await
		.map(Json)
}

/// Handles POST /api/orders/{order_id}/mark-delivered requests.
async fn handle_mark_delivered(
	Path(order_id): Path<String>,
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<ResolveResponse>, APIError> {
	let request = parse_body(&body)?;
	apis::staff::resolve(&order_id, CheckpointKind::MarkDelivered, request, &state.coordinator)
		.await
		.map(Json)
}

/// Handles POST /api/callbacks/checkpoints requests.
async fn handle_checkpoint_callback(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<CheckpointAck>, APIError> {
	let callback = parse_body(&body)?;
	apis::callbacks::record_checkpoint(callback, &state.coordinator)
		.await
		.map(Json)
}

/// Handles POST /api/callbacks/status requests.
async fn handle_status_callback(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<TransitionResponse>, APIError> {
	let callback = parse_body(&body)?;
	apis::callbacks::apply_status(callback, &state.coordinator)
		.await
		.map(Json)
}

async fn handle_health(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"service": state.coordinator.config().service.id,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{body::Body, http::Request};
	use fulfillment_config::ConfigBuilder;
	use tower::ServiceExt;

	fn test_api_config() -> ApiConfig {
		ApiConfig {
			enabled: true,
			host: "127.0.0.1".to_string(),
			port: 0,
			timeout_seconds: 5,
			max_request_size: 16 * 1024,
			cors: None,
		}
	}

	fn test_router() -> Router {
		let coordinator =
			crate::factory_registry::build_coordinator(ConfigBuilder::new().build()).unwrap();
		router(&test_api_config(), coordinator)
	}

	async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
		let mut request = Request::builder().method(method).uri(uri);
		let body = match body {
			Some(value) => {
				request = request.header("content-type", "application/json");
				Body::from(value.to_string())
			},
			None => Body::empty(),
		};

		let response = app
			.clone()
			.oneshot(request.body(body).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	#[tokio::test]
	async fn test_fulfillment_over_http() {
		let app = test_router();

		let (status, body) = call(
			&app,
			Method::POST,
			"/api/orders",
			Some(json!({ "detail": { "order_id": "O1", "tenant_id": "T1", "total": 42.5 } })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert!(body["execution_arn"].as_str().unwrap().contains("order-O1-"));

		let (status, body) = call(
			&app,
			Method::POST,
			"/api/callbacks/checkpoints",
			Some(json!({ "taskToken": "tok-1", "step": "ASSIGN_COOK", "order": { "order_id": "O1" } })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({ "status": "OK", "order_id": "O1", "step": "ASSIGN_COOK" }));

		let (status, body) = call(
			&app,
			Method::POST,
			"/api/orders/O1/mark-delivered",
			Some(json!({ "staff_id": "C1", "staff_name": "Luis" })),
		)
		.await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "CHECKPOINT_CONFLICT");

		let (status, body) = call(
			&app,
			Method::POST,
			"/api/orders/O1/assign-cook",
			Some(json!({ "staff_id": "S1", "staff_name": "Ana" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["order_id"], "O1");

		let (status, body) = call(
			&app,
			Method::POST,
			"/api/callbacks/status",
			Some(json!({ "action": "COOKING", "payload": { "order_id": "O1" } })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "COCINANDO");

		let (status, body) = call(&app, Method::GET, "/api/orders/O1", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "COCINANDO");
		assert!(body.get("pending_checkpoint").is_none());
	}

	#[tokio::test]
	async fn test_order_lookup_hides_checkpoint_token() {
		let app = test_router();

		let (status, _) = call(
			&app,
			Method::POST,
			"/api/callbacks/checkpoints",
			Some(json!({ "taskToken": "tok-secret", "step": "ASSIGN_COOK", "order": { "order_id": "O2" } })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);

		let (status, body) = call(&app, Method::GET, "/api/orders/O2", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["pending_checkpoint"]["step_name"], "ASSIGN_COOK");
		assert!(body["pending_checkpoint"].get("token").is_none());
		assert!(!body.to_string().contains("tok-secret"));
	}

	#[tokio::test]
	async fn test_missing_body_requires_staff_identity() {
		let app = test_router();
		let (status, body) = call(&app, Method::POST, "/api/orders/O1/assign-cook", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");
	}

	#[tokio::test]
	async fn test_unknown_order_is_not_found() {
		let app = test_router();
		let (status, body) = call(&app, Method::GET, "/api/orders/missing", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "ORDER_NOT_FOUND");
	}

	#[tokio::test]
	async fn test_unknown_action_is_unprocessable() {
		let app = test_router();
		let (status, body) = call(
			&app,
			Method::POST,
			"/api/callbacks/status",
			Some(json!({ "action": "REFUND", "payload": { "order_id": "O1" } })),
		)
		.await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "UNKNOWN_ACTION");
	}

	#[tokio::test]
	async fn test_oversized_body_is_rejected() {
		let app = test_router();
		let note = "x".repeat(test_api_config().max_request_size + 1);
		let payload = json!({ "detail": { "order_id": "O1", "note": note } }).to_string();

		let request = Request::builder()
			.method(Method::POST)
			.uri("/api/orders")
			.header("content-type", "application/json")
			.header("content-length", payload.len())
			.body(Body::from(payload))
			.unwrap();
		let response = app.clone().oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

		let (status, _) = call(&app, Method::GET, "/api/orders/O1", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_health() {
		let app = test_router();
		let (status, body) = call(&app, Method::GET, "/health", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "ok");
	}
}
