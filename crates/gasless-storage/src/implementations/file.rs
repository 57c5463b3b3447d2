//! File-based storage backend.
//!
//! Each key is one file under `storage_path`. Writes go to a temp file and are
//! renamed into place, and every mutation holds an exclusive advisory lock on
//! the directory's single `.storage.lock` file. Several relay processes may
//! therefore share one directory without losing compare-and-swap atomicity.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use gasless_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DEFAULT_STORAGE_PATH: &str = "./data/storage";
const LOCK_FILE: &str = ".storage.lock";

pub struct FileStorage {
	base_path: PathBuf,
}

/// Exclusive lock on the storage directory, released when dropped.
struct DirLock {
	_file: File,
}

impl DirLock {
	fn acquire(path: &Path) -> Result<Self, StorageError> {
		let file = OpenOptions::new()
			.create(true)
			.truncate(false)
			.write(true)
			.open(path)
			.map_err(|e| StorageError::Backend(format!("open {}: {}", path.display(), e)))?;
		file.lock_exclusive()
			.map_err(|e| StorageError::Backend(format!("lock {}: {}", path.display(), e)))?;
		Ok(Self { _file: file })
	}
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a key to a filesystem-safe stem under the base path.
	fn stem(&self, key: &str) -> PathBuf {
		self.base_path.join(key.replace(['/', ':', '\\'], "_"))
	}

	fn data_path(&self, key: &str) -> PathBuf {
		self.stem(key).with_extension("bin")
	}

	/// Runs `op` on a blocking thread while holding the directory lock.
	async fn with_dir_lock<T, F>(&self, key: &str, op: F) -> Result<T, StorageError>
	where
		T: Send + 'static,
		F: FnOnce(&Path) -> Result<T, StorageError> + Send + 'static,
	{
		let base_path = self.base_path.clone();
		let data_path = self.data_path(key);
		let lock_path = self.base_path.join(LOCK_FILE);

		tokio::task::spawn_blocking(move || {
			std::fs::create_dir_all(&base_path)
				.map_err(|e| StorageError::Backend(e.to_string()))?;
			let _lock = DirLock::acquire(&lock_path)?;
			op(&data_path)
		})
		.await
		.map_err(|e| StorageError::Backend(format!("storage task failed: {}", e)))?
	}
}

fn read_current(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
	match std::fs::read(path) {
		Ok(data) => Ok(Some(data)),
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
		Err(e) => Err(StorageError::Backend(e.to_string())),
	}
}

fn write_atomic(path: &Path, value: &[u8]) -> Result<(), StorageError> {
	let temp_path = path.with_extension("tmp");
	std::fs::write(&temp_path, value).map_err(|e| StorageError::Backend(e.to_string()))?;
	std::fs::rename(&temp_path, path).map_err(|e| StorageError::Backend(e.to_string()))
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match tokio::fs::read(self.data_path(key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.with_dir_lock(key, move |path| write_atomic(path, &value))
			.await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.with_dir_lock(key, |path| match std::fs::remove_file(path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		})
		.await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		tokio::fs::try_exists(self.data_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		new: Vec<u8>,
	) -> Result<bool, StorageError> {
		let expected = expected.map(<[u8]>::to_vec);
		self.with_dir_lock(key, move |path| {
			if read_current(path)? != expected {
				return Ok(false);
			}
			write_atomic(path, &new)?;
			Ok(true)
		})
		.await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if path.trim().is_empty() => {
							Err("storage_path cannot be empty".to_string())
						},
						_ => Ok(()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Creates a file backend.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
