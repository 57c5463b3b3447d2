//! Storage for the gasless authorization service.
//!
//! Backends implement a small byte-level [`StorageInterface`]; the
//! [`StorageService`] layers JSON (de)serialization and `namespace:id` keys on
//! top. The one operation every backend must make atomic is
//! [`StorageInterface::compare_and_swap`], which the nonce registry relies on
//! for its check-and-increment.

use async_trait::async_trait;
use gasless_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Byte-level key-value operations a backend provides.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Returns the bytes stored under `key`, or `NotFound`.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores `value` under `key`, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Removes `key`. Removing an absent key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Atomically replaces the value under `key` with `new` if the current
	/// value equals `expected` (`None` meaning absent).
	///
	/// Returns `Ok(false)` without writing when the current value differs.
	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		new: Vec<u8>,
	) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Factory signature every storage implementation provides.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Returns `(name, factory)` for every built-in storage implementation.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed storage over a backend.
///
/// Values are JSON encoded and stored under `namespace:id`.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
		serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes = Self::encode(data)?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Like [`retrieve`](Self::retrieve) but maps `NotFound` to `None`.
	pub async fn retrieve_optional<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Typed compare-and-swap. Both sides are compared in their JSON
	/// encoding, so `T` must serialize deterministically.
	pub async fn compare_and_swap<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		expected: Option<&T>,
		new: &T,
	) -> Result<bool, StorageError> {
		let expected = expected.map(Self::encode).transpose()?;
		let new = Self::encode(new)?;
		self.backend
			.compare_and_swap(&Self::key(namespace, id), expected.as_deref(), new)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Entry {
		sender: String,
		amount: u64,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_store_and_retrieve() {
		let storage = service();
		let entry = Entry {
			sender: "0xabc".into(),
			amount: 42,
		};

		storage.store("authorizations", "1", &entry).await.unwrap();
		let back: Entry = storage.retrieve("authorizations", "1").await.unwrap();
		assert_eq!(back, entry);
		assert!(storage.exists("authorizations", "1").await.unwrap());
		assert!(!storage.exists("nonces", "1").await.unwrap());

		storage.remove("authorizations", "1").await.unwrap();
		assert!(matches!(
			storage.retrieve::<Entry>("authorizations", "1").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_retrieve_optional() {
		let storage = service();
		let missing: Option<String> = storage.retrieve_optional("nonces", "a").await.unwrap();
		assert!(missing.is_none());

		storage.store("nonces", "a", &"3".to_string()).await.unwrap();
		let found: Option<String> = storage.retrieve_optional("nonces", "a").await.unwrap();
		assert_eq!(found.as_deref(), Some("3"));
	}

	#[tokio::test]
	async fn test_retrieve_wrong_type() {
		let storage = service();
		storage.store("nonces", "a", &"3".to_string()).await.unwrap();
		assert!(matches!(
			storage.retrieve::<Entry>("nonces", "a").await,
			Err(StorageError::Serialization(_))
		));
	}

	#[tokio::test]
	async fn test_typed_compare_and_swap() {
		let storage = service();
		let zero = "0".to_string();
		let one = "1".to_string();

		assert!(storage
			.compare_and_swap("nonces", "a", None, &one)
			.await
			.unwrap());
		assert!(!storage
			.compare_and_swap("nonces", "a", Some(&zero), &one)
			.await
			.unwrap());
		assert!(storage
			.compare_and_swap("nonces", "a", Some(&one), &"2".to_string())
			.await
			.unwrap());

		let value: String = storage.retrieve("nonces", "a").await.unwrap();
		assert_eq!(value, "2");
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["file", "memory"]);
	}
}
