//! Coordinator wired to in-memory collaborators, with fault injection.

use crate::FulfillmentCoordinator;
use async_trait::async_trait;
use fulfillment_config::ConfigBuilder;
use fulfillment_events::{implementations::memory::MemoryEventSink, EventService};
use fulfillment_storage::{
	implementations::memory::MemoryStorage, StorageError, StorageInterface, StorageService,
	VersionedBytes,
};
use fulfillment_types::ConfigSchema;
use fulfillment_workflow::{implementations::memory::MemoryWorkflowEngine, WorkflowService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Switch shared with [`FaultyStorage`].
#[derive(Clone, Default)]
pub(crate) struct StorageFaults(Arc<AtomicBool>);

impl StorageFaults {
	pub(crate) fn fail_writes(&self, fail: bool) {
		self.0.store(fail, Ordering::SeqCst);
	}
}

/// Memory storage whose writes can be made to fail.
struct FaultyStorage {
	inner: MemoryStorage,
	faults: StorageFaults,
}

#[async_trait]
impl StorageInterface for FaultyStorage {
	async fn get_bytes(&self, key: &str) -> Result<VersionedBytes, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn compare_and_set(
		&self,
		key: &str,
		value: Vec<u8>,
		expected: Option<u64>,
	) -> Result<u64, StorageError> {
		if self.faults.0.load(Ordering::SeqCst) {
			return Err(StorageError::Backend("injected write failure".into()));
		}
		self.inner.compare_and_set(key, value, expected).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.inner.exists(key).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		self.inner.config_schema()
	}
}

pub(crate) struct Harness {
	pub coordinator: FulfillmentCoordinator,
	pub engine: MemoryWorkflowEngine,
	pub sink: MemoryEventSink,
	pub storage: StorageFaults,
}

pub(crate) fn harness() -> Harness {
	let config = ConfigBuilder::new().build();
	let engine = MemoryWorkflowEngine::new();
	let sink = MemoryEventSink::new();
	let faults = StorageFaults::default();

	let storage = Arc::new(StorageService::new(
		Box::new(FaultyStorage {
			inner: MemoryStorage::new(),
			faults: faults.clone(),
		}),
		config.storage.max_update_attempts,
	));
	let workflow = Arc::new(WorkflowService::new(
		Box::new(engine.clone()),
		config.service.process_id.clone(),
	));
	let events = Arc::new(EventService::new(
		Box::new(sink.clone()),
		config.service.event_source.clone(),
	));

	Harness {
		coordinator: FulfillmentCoordinator::new(config, storage, workflow, events),
		engine,
		sink,
		storage: faults,
	}
}
