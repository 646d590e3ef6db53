//! Storage module for the fulfillment coordinator.
//!
//! Backends are versioned key-value stores: every write is a compare-and-set
//! against the version that was read. On top of that, [`StorageService`]
//! offers field-level operations on JSON documents (set, add-to-set, remove,
//! conditional updates) that are atomic per record: a concurrent writer on the
//! same key forces a re-read and re-apply instead of overwriting.

use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ImplementationRegistry};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

mod document;

pub use document::DocumentUpdate;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The requested record does not exist.
	#[error("Not found")]
	NotFound,
	/// The record changed between read and write.
	#[error("Version conflict on '{key}'")]
	VersionConflict { key: String },
	/// A conditional update found a field with a different value.
	#[error("Condition failed: {0}")]
	ConditionFailed(String),
	/// Concurrent writers kept winning until the attempt budget ran out.
	#[error("Update of '{key}' abandoned after {attempts} conflicting attempts")]
	Contention { key: String, attempts: u32 },
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Bytes of a record together with the version they were written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBytes {
	pub data: Vec<u8>,
	pub version: u64,
}

/// Trait defining the low-level interface for storage backends.
///
/// Versions start at 1 for a newly created key and increase by one on every
/// successful write.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes and their version for the given key.
	async fn get_bytes(&self, key: &str) -> Result<VersionedBytes, StorageError>;

	/// Writes `value` if the stored version equals `expected`.
	///
	/// `expected = None` means the key must not exist yet. Returns the new
	/// version, or [`StorageError::VersionConflict`] when another write got in
	/// first.
	async fn compare_and_set(
		&self,
		key: &str,
		value: Vec<u8>,
		expected: Option<u64>,
	) -> Result<u64, StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Factory signature every storage implementation provides.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level storage service working on JSON documents.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Read-apply-write attempts before giving up on a contended record.
	max_attempts: u32,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>, max_attempts: u32) -> Self {
		Self {
			backend,
			max_attempts: max_attempts.max(1),
		}
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Retrieves and deserializes a document.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes.data).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Checks if a document exists.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Applies a field-level update atomically and returns the resulting document.
	///
	/// The document is read with its version, the update is applied in memory
	/// and written back with compare-and-set. Losing the race to another writer
	/// re-runs the whole cycle against the fresh document, up to the configured
	/// number of attempts. Failed conditions are not retried.
	pub async fn apply(
		&self,
		namespace: &str,
		id: &str,
		update: &DocumentUpdate,
	) -> Result<Map<String, Value>, StorageError> {
		let key = Self::key(namespace, id);

		for attempt in 1..=self.max_attempts {
			let (current, version) = match self.backend.get_bytes(&key).await {
				Ok(bytes) => (Some(decode_document(&bytes.data)?), Some(bytes.version)),
				Err(StorageError::NotFound) => (None, None),
				Err(e) => return Err(e),
			};

			let document = update.apply_to(current)?;
			let encoded = serde_json::to_vec(&document)
				.map_err(|e| StorageError::Serialization(e.to_string()))?;

			match self.backend.compare_and_set(&key, encoded, version).await {
				Ok(_) => return Ok(document),
				Err(StorageError::VersionConflict { .. }) => {
					tracing::debug!(key = %key, attempt, "Concurrent write detected, re-applying update");
				},
				Err(e) => return Err(e),
			}
		}

		Err(StorageError::Contention {
			key,
			attempts: self.max_attempts,
		})
	}

	/// Sets the given top-level fields, creating the document if needed.
	pub async fn upsert_fields(
		&self,
		namespace: &str,
		id: &str,
		fields: Map<String, Value>,
	) -> Result<Map<String, Value>, StorageError> {
		let update = fields
			.into_iter()
			.fold(DocumentUpdate::new(), |update, (field, value)| {
				update.set(field, value)
			});
		self.apply(namespace, id, &update).await
	}
}

fn decode_document(data: &[u8]) -> Result<Map<String, Value>, StorageError> {
	match serde_json::from_slice(data) {
		Ok(Value::Object(map)) => Ok(map),
		Ok(other) => Err(StorageError::Serialization(format!(
			"Stored record is not a document: {}",
			other
		))),
		Err(e) => Err(StorageError::Serialization(e.to_string())),
	}
}
