//! In-memory storage backend.
//!
//! Records live in a HashMap behind a read-write lock. Nothing survives a
//! restart, which makes this backend the default for tests and local runs.

use crate::{StorageError, StorageInterface, VersionedBytes};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
pub struct MemoryStorage {
	/// Version and bytes per key.
	store: Arc<RwLock<HashMap<String, (u64, Vec<u8>)>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<VersionedBytes, StorageError> {
		let store = self.store.read().await;
		store
			.get(key)
			.map(|(version, data)| VersionedBytes {
				data: data.clone(),
				version: *version,
			})
			.ok_or(StorageError::NotFound)
	}

	async fn compare_and_set(
		&self,
		key: &str,
		value: Vec<u8>,
		expected: Option<u64>,
	) -> Result<u64, StorageError> {
		let mut store = self.store.write().await;
		let current = store.get(key).map(|(version, _)| *version);
		if current != expected {
			return Err(StorageError::VersionConflict {
				key: key.to_string(),
			});
		}

		let next = current.unwrap_or(0) + 1;
		store.insert(key.to_string(), (next, value));
		Ok(next)
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}
