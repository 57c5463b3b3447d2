//! EIP-712 signing domain.
//!
//! A domain pins signatures to one protocol instance. Changing any field
//! yields a different separator and so invalidates every signature issued
//! under the old one.

use crate::utils::eip712::{Eip712Error, Eip712Value, TypeSchema, TypedMessage, DOMAIN_SCHEMA};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Identity of the verifying protocol instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
	/// Human-readable protocol name, e.g. "Gasless".
	pub name: String,
	/// Protocol version string.
	pub version: String,
	/// Chain the verifying authority lives on.
	///
	/// Hashed as `uint256`. Ids above `u64::MAX` are not representable; no
	/// deployed chain uses one.
	pub chain_id: u64,
	/// Address of the verifying authority.
	pub verifying_contract: Address,
}

impl Domain {
	pub fn new(
		name: impl Into<String>,
		version: impl Into<String>,
		chain_id: u64,
		verifying_contract: Address,
	) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
			chain_id,
			verifying_contract,
		}
	}

	/// Computes the domain separator (`hashStruct(EIP712Domain)`).
	///
	/// Pure and deterministic; callers are expected to compute it once and
	/// keep the result.
	pub fn separator(&self) -> Result<B256, Eip712Error> {
		self.struct_hash()
	}
}

impl TypedMessage for Domain {
	fn schema(&self) -> &'static TypeSchema {
		&DOMAIN_SCHEMA
	}

	fn values(&self) -> Vec<Eip712Value> {
		vec![
			Eip712Value::String(self.name.clone()),
			Eip712Value::String(self.version.clone()),
			Eip712Value::Uint256(U256::from(self.chain_id)),
			Eip712Value::Address(self.verifying_contract),
		]
	}
}
