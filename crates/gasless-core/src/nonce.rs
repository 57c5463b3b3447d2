//! Per-signer nonce registry.
//!
//! Each signer has one counter, stored as a decimal string under
//! `nonces:<lowercase address>` and read as 0 when absent. A nonce is
//! consumed by an atomic compare-and-swap from `n` to `n + 1`, so two
//! concurrent consumers of the same nonce cannot both succeed.

use alloy_primitives::{Address, U256};
use gasless_storage::{StorageError, StorageService};
use gasless_types::StorageKey;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NonceError {
	#[error("expected nonce {expected}, got {supplied}")]
	Mismatch { expected: U256, supplied: U256 },
	#[error("nonce space exhausted")]
	Overflow,
	#[error("stored nonce is not a decimal integer: {0}")]
	Corrupt(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

pub struct NonceRegistry {
	storage: Arc<StorageService>,
}

impl NonceRegistry {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	fn id(identity: &Address) -> String {
		format!("{:#x}", identity)
	}

	/// Returns the raw stored value; `None` when the signer has no entry.
	async fn stored(&self, identity: &Address) -> Result<Option<String>, NonceError> {
		self.storage
			.retrieve_optional(StorageKey::Nonces.as_str(), &Self::id(identity))
			.await
			.map_err(|e: StorageError| NonceError::Storage(e.to_string()))
	}

	fn parse(stored: Option<&str>) -> Result<U256, NonceError> {
		match stored {
			None => Ok(U256::ZERO),
			Some(raw) => U256::from_str(raw).map_err(|_| NonceError::Corrupt(raw.to_string())),
		}
	}

	/// The next nonce `identity` must sign.
	pub async fn expected_nonce(&self, identity: &Address) -> Result<U256, NonceError> {
		let stored = self.stored(identity).await?;
		Self::parse(stored.as_deref())
	}

	/// Consumes `supplied` if it is the expected nonce and returns the new
	/// expected value.
	pub async fn consume(&self, identity: &Address, supplied: U256) -> Result<U256, NonceError> {
		let stored = self.stored(identity).await?;
		let expected = Self::parse(stored.as_deref())?;
		if supplied != expected {
			return Err(NonceError::Mismatch { expected, supplied });
		}

		let next = expected.checked_add(U256::from(1u8)).ok_or(NonceError::Overflow)?;
		let swapped = self
			.storage
			.compare_and_swap(
				StorageKey::Nonces.as_str(),
				&Self::id(identity),
				stored.as_ref(),
				&next.to_string(),
			)
			.await
			.map_err(|e| NonceError::Storage(e.to_string()))?;

		if !swapped {
			// Another consumer got there between our read and the swap.
			let expected = self.expected_nonce(identity).await?;
			return Err(NonceError::Mismatch { expected, supplied });
		}

		Ok(next)
	}

	/// Undoes a successful [`consume`](Self::consume) of `consumed`.
	///
	/// Fails with `Mismatch` if the counter has moved on since.
	pub async fn release(&self, identity: &Address, consumed: U256) -> Result<(), NonceError> {
		let current = consumed.checked_add(U256::from(1u8)).ok_or(NonceError::Overflow)?;
		let swapped = self
			.storage
			.compare_and_swap(
				StorageKey::Nonces.as_str(),
				&Self::id(identity),
				Some(&current.to_string()),
				&consumed.to_string(),
			)
			.await
			.map_err(|e| NonceError::Storage(e.to_string()))?;

		if !swapped {
			let expected = self.expected_nonce(identity).await?;
			return Err(NonceError::Mismatch {
				expected,
				supplied: current,
			});
		}
		Ok(())
	}
}
