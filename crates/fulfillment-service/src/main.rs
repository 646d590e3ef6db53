//! Main entry point for the order fulfillment service.
//!
//! Loads configuration, wires the configured storage, workflow engine and
//! event sink into a coordinator, and serves the HTTP API that the order
//! notifications, engine callbacks and staff requests arrive on.

use clap::Parser;
use fulfillment_config::Config;
use fulfillment_core::FulfillmentCoordinator;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the fulfillment service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/fulfillment.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the fulfillment service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the coordinator with the configured implementations
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started fulfillment service");

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let coordinator = factory_registry::build_coordinator(config.clone())?;
	spawn_event_logger(&coordinator);

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, coordinator) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown requested");
				}
			}
		},
		None => {
			tracing::warn!("API server disabled; no inbound triggers will be served");
			tokio::signal::ctrl_c().await?;
		},
	}

	tracing::info!("Stopped fulfillment service");
	Ok(())
}

/// Logs every event delivered by a subscribable sink.
fn spawn_event_logger(coordinator: &FulfillmentCoordinator) {
	let Some(mut events) = coordinator.events().subscribe() else {
		return;
	};

	tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(event) => tracing::info!(
					source = %event.source,
					detail_type = %event.detail_type,
					order_id = %event.order_id().unwrap_or("-"),
					"Event delivered"
				),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Event logger lagged behind");
				},
				Err(RecvError::Closed) => break,
			}
		}
	});
}
