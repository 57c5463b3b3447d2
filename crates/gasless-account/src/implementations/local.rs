//! Local private-key account.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use gasless_types::{
	without_0x_prefix, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	SecretString, SignatureParts, ValidationError,
};

/// Account backed by a secp256k1 key held in process memory.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Parses a hex private key, with or without `0x`.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key
			.with_exposed(|key| without_0x_prefix(key.trim()).parse::<PrivateKeySigner>())
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;
		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_hash(&self, hash: &B256) -> Result<SignatureParts, AccountError> {
		let signature = self
			.signer
			.sign_hash_sync(hash)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		// 65 bytes r || s || v with v in 27/28.
		SignatureParts::from_bytes(&signature.as_bytes())
			.map_err(|e| AccountError::SigningFailed(e.to_string()))
	}
}

/// Requires `private_key` as 32 bytes of hex.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().map(without_0x_prefix).unwrap_or_default();
					if key.len() != 64 {
						return Err("Private key must be 64 hex characters (32 bytes)".into());
					}
					if !key.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("Private key must be valid hex".into());
					}
					Ok(())
				}),
			],
			vec![],
		);
		schema.validate(config)
	}
}

/// Creates a local account.
///
/// Configuration parameters:
/// - `private_key`: hex encoded secp256k1 key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key missing".into()))?;

	Ok(Box::new(LocalWallet::new(&private_key)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}
