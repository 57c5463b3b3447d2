//! Signer side of the gasless protocol.
//!
//! An account holds a key and signs EIP-712 digests, which is what a wallet
//! does for `eth_signTypedData_v4`. The relay itself never needs an account
//! to verify; it is used by the `sign` helper and by tests.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use gasless_types::{
	AuthorizationMessage, ConfigSchema, ImplementationRegistry, SignatureParts, TypedMessage,
};
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Implementation error: {0}")]
	Implementation(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte digest without any prefixing.
	async fn sign_hash(&self, hash: &B256) -> Result<SignatureParts, AccountError>;
}

pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Wraps an account implementation with typed-data signing helpers.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	pub async fn sign_hash(&self, hash: &B256) -> Result<SignatureParts, AccountError> {
		self.implementation.sign_hash(hash).await
	}

	/// Signs any typed message under `domain_separator`.
	pub async fn sign_typed<M: TypedMessage + Sync>(
		&self,
		domain_separator: &B256,
		message: &M,
	) -> Result<SignatureParts, AccountError> {
		let digest = gasless_types::typed_data_digest(domain_separator, message)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		self.sign_hash(&digest).await
	}

	/// Signs an authorization, refusing messages whose `sender` is not this
	/// account since no relay would accept them.
	pub async fn sign_authorization(
		&self,
		domain_separator: &B256,
		message: &AuthorizationMessage,
	) -> Result<SignatureParts, AccountError> {
		let address = self.get_address().await?;
		if message.sender != address {
			return Err(AccountError::SigningFailed(format!(
				"message sender {} is not the signing account {}",
				message.sender, address
			)));
		}
		self.sign_typed(domain_separator, message).await
	}
}
