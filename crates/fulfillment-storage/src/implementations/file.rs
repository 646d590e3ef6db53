//! File-based storage backend.
//!
//! Each record is one file: a fixed header carrying the record version,
//! followed by the record bytes. Writes take an exclusive advisory lock on a
//! sidecar `.lock` file, check the version, write a temp file and rename it
//! over the record, so readers always see a complete record.

use crate::{StorageError, StorageInterface, VersionedBytes};
use async_trait::async_trait;
use fs2::FileExt;
use fulfillment_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[allow(clippy::doc_nested_refdefs)]
/// Fixed-size record header.
///
/// Binary layout (32 bytes total):
/// - [0-3]: Magic bytes "FFOS"
/// - [4-5]: Format version (u16, little-endian)
/// - [6-13]: Record version (u64, little-endian)
/// - [14-31]: Reserved
#[derive(Debug, Clone, PartialEq)]
struct FileHeader {
	format: u16,
	record_version: u64,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"FFOS";
	const FORMAT: u16 = 1;
	const SIZE: usize = 32;

	fn new(record_version: u64) -> Self {
		Self {
			format: Self::FORMAT,
			record_version,
		}
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.format.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.record_version.to_le_bytes());
		bytes
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}
		if &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized record file".into()));
		}

		let format = u16::from_le_bytes([bytes[4], bytes[5]]);
		if format > Self::FORMAT {
			return Err(StorageError::Backend(format!(
				"Unsupported file format: {}",
				format
			)));
		}

		let mut version_bytes = [0u8; 8];
		version_bytes.copy_from_slice(&bytes[6..14]);

		Ok(Self {
			format,
			record_version: u64::from_le_bytes(version_bytes),
		})
	}
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

/// Percent-encodes every byte outside `[A-Za-z0-9._-]`.
fn encode_key(key: &str) -> String {
	let mut encoded = String::with_capacity(key.len());
	for byte in key.bytes() {
		if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
			encoded.push(byte as char);
		} else {
			encoded.push('%');
			encoded.push_str(&hex::encode_upper([byte]));
		}
	}
	encoded
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a storage key to a file path. Distinct keys map to distinct files.
	fn get_file_path(&self, key: &str) -> PathBuf {
		self.base_path.join(format!("{}.bin", encode_key(key)))
	}

	async fn run_blocking<T, F>(f: F) -> Result<T, StorageError>
	where
		T: Send + 'static,
		F: FnOnce() -> Result<T, StorageError> + Send + 'static,
	{
		tokio::task::spawn_blocking(f)
			.await
			.map_err(|e| StorageError::Backend(format!("Storage task failed: {}", e)))?
	}
}

fn backend_error(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

fn read_record(path: &Path) -> Result<Option<VersionedBytes>, StorageError> {
	let data = match fs::read(path) {
		Ok(data) => data,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(backend_error(e)),
	};

	let header = FileHeader::deserialize(&data)?;
	Ok(Some(VersionedBytes {
		data: data[FileHeader::SIZE..].to_vec(),
		version: header.record_version,
	}))
}

fn write_record_locked(
	path: &Path,
	value: &[u8],
	expected: Option<u64>,
	key: &str,
) -> Result<u64, StorageError> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).map_err(backend_error)?;
	}

	let lock_file = OpenOptions::new()
		.create(true)
		.truncate(false)
		.write(true)
		.open(path.with_extension("lock"))
		.map_err(backend_error)?;
	lock_file.lock_exclusive().map_err(backend_error)?;

	let result = (|| {
		let current = read_record(path)?.map(|record| record.version);
		if current != expected {
			return Err(StorageError::VersionConflict {
				key: key.to_string(),
			});
		}
		let next = current.unwrap_or(0) + 1;

		let temp_path = path.with_extension("tmp");
		let mut temp = fs::File::create(&temp_path).map_err(backend_error)?;
		temp.write_all(&FileHeader::new(next).serialize())
			.map_err(backend_error)?;
		temp.write_all(value).map_err(backend_error)?;
		temp.sync_all().map_err(backend_error)?;
		fs::rename(&temp_path, path).map_err(backend_error)?;

		Ok(next)
	})();

	if let Err(e) = lock_file.unlock() {
		tracing::warn!(path = %path.display(), error = %e, "Failed to release record lock");
	}
	result
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<VersionedBytes, StorageError> {
		let path = self.get_file_path(key);
		Self::run_blocking(move || read_record(&path))
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn compare_and_set(
		&self,
		key: &str,
		value: Vec<u8>,
		expected: Option<u64>,
	) -> Result<u64, StorageError> {
		let path = self.get_file_path(key);
		let key = key.to_string();
		Self::run_blocking(move || write_record_locked(&path, &value, expected, &key)).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key);
		Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("storage_path cannot be empty".into()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for record files (default: "./data/orders")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/orders");

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = crate::StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{DocumentUpdate, StorageService};
	use serde_json::{json, Value};
	use std::sync::Arc;
	use tempfile::TempDir;

	#[test]
	fn test_header_layout() {
		let header = FileHeader::new(42);
		let bytes = header.serialize();
		assert_eq!(&bytes[0..4], b"FFOS");
		assert_eq!(FileHeader::deserialize(&bytes).unwrap(), header);

		let mut future = bytes;
		future[4..6].copy_from_slice(&9u16.to_le_bytes());
		assert!(FileHeader::deserialize(&future).is_err());
		assert!(FileHeader::deserialize(b"FFOS").is_err());
	}

	#[test]
	fn test_key_encoding_is_reversible() {
		assert_eq!(encode_key("orders:O1"), "orders%3AO1");
		assert_eq!(encode_key("orders:T1_O1"), "orders%3AT1_O1");
		assert_eq!(encode_key("orders:T1:O1"), "orders%3AT1%3AO1");
		assert_eq!(encode_key("orders:a/b%"), "orders%3Aa%2Fb%25");
	}

	#[tokio::test]
	async fn test_similar_order_ids_stay_separate() {
		let temp_dir = TempDir::new().unwrap();
		let service = StorageService::new(
			Box::new(FileStorage::new(temp_dir.path().to_path_buf())),
			4,
		);

		service
			.apply(
				"orders",
				"T1:O1",
				&DocumentUpdate::new().set("pending_checkpoint", json!({ "token": "tok-1" })),
			)
			.await
			.unwrap();

		assert!(matches!(
			service.retrieve::<Value>("orders", "T1_O1").await,
			Err(StorageError::NotFound)
		));
		assert!(!service.exists("orders", "T1/O1").await.unwrap());
		let stored: Value = service.retrieve("orders", "T1:O1").await.unwrap();
		assert_eq!(stored["pending_checkpoint"]["token"], "tok-1");
	}

	#[tokio::test]
	async fn test_records_persist_across_instances() {
		let temp_dir = TempDir::new().unwrap();

		let storage = FileStorage::new(temp_dir.path().to_path_buf());
		let version = storage
			.compare_and_set("orders:O1", b"{\"order_id\":\"O1\"}".to_vec(), None)
			.await
			.unwrap();
		assert_eq!(version, 1);

		let reopened = FileStorage::new(temp_dir.path().to_path_buf());
		let record = reopened.get_bytes("orders:O1").await.unwrap();
		assert_eq!(record.version, 1);
		assert_eq!(record.data, b"{\"order_id\":\"O1\"}".to_vec());
		assert!(reopened.exists("orders:O1").await.unwrap());
		assert!(!reopened.exists("orders:O2").await.unwrap());
	}

	#[tokio::test]
	async fn test_version_conflict() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());

		storage
			.compare_and_set("orders:O1", b"a".to_vec(), None)
			.await
			.unwrap();
		let err = storage
			.compare_and_set("orders:O1", b"b".to_vec(), None)
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::VersionConflict { .. }));

		let v2 = storage
			.compare_and_set("orders:O1", b"b".to_vec(), Some(1))
			.await
			.unwrap();
		assert_eq!(v2, 2);
		assert!(matches!(
			storage.get_bytes("orders:missing").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_document_updates() {
		let temp_dir = TempDir::new().unwrap();
		let service = Arc::new(StorageService::new(
			Box::new(FileStorage::new(temp_dir.path().to_path_buf())),
			100,
		));

		let mut handles = Vec::new();
		for i in 0..10 {
			let service = service.clone();
			handles.push(tokio::spawn(async move {
				service
					.apply(
						"orders",
						"O1",
						&DocumentUpdate::new().add_to_set("history", json!(i)),
					)
					.await
			}));
		}
		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		let doc: Value = service.retrieve("orders", "O1").await.unwrap();
		assert_eq!(doc["history"].as_array().unwrap().len(), 10);
	}

	#[test]
	fn test_schema_rejects_empty_path() {
		let config: toml::Value = toml::from_str("storage_path = \"\"").unwrap();
		assert!(create_storage(&config).is_err());

		let config: toml::Value = toml::from_str("storage_path = \"/tmp/orders\"").unwrap();
		assert!(FileStorageSchema.validate(&config).is_ok());
	}
}
