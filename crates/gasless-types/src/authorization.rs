//! Authorization messages and the audit records they produce.
//!
//! An [`AuthorizationMessage`] is what a sender signs off-band. When it is
//! accepted, the dispatcher emits an [`AuthorizedCall`] and persists an
//! [`AuthorizationRecord`] for audit.

use crate::api::u256_serde;
use crate::utils::eip712::{
	typed_data_digest, Eip712Error, Eip712Value, TypeSchema, TypedMessage, AUTHORIZATION_SCHEMA,
};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// The `SomeFunc` struct a sender signs to pre-authorize a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
	pub sender: Address,
	pub receivers: Vec<Address>,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// Unix timestamp (seconds) after which the authorization is void.
	#[serde(with = "u256_serde")]
	pub deadline: U256,
	/// The sender's registry nonce this authorization consumes.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
}

impl AuthorizationMessage {
	/// Computes the digest the sender signs under `domain_separator`.
	pub fn signing_digest(&self, domain_separator: &B256) -> Result<B256, Eip712Error> {
		typed_data_digest(domain_separator, self)
	}
}

impl TypedMessage for AuthorizationMessage {
	fn schema(&self) -> &'static TypeSchema {
		&AUTHORIZATION_SCHEMA
	}

	fn values(&self) -> Vec<Eip712Value> {
		vec![
			Eip712Value::Address(self.sender),
			Eip712Value::AddressArray(self.receivers.clone()),
			Eip712Value::Uint256(self.amount),
			Eip712Value::Uint256(self.deadline),
			Eip712Value::Uint256(self.nonce),
		]
	}
}

/// The audit event emitted once per accepted authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedCall {
	pub sender: Address,
	pub receivers: Vec<Address>,
	#[serde(with = "u256_serde")]
	pub amount: U256,
}

/// How the sender of an accepted call was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
	/// The caller's own identity, vouched for by the host environment.
	Direct,
	/// A signature recovered to the sender and submitted by a relayer.
	Delegated,
}

/// Persisted form of an accepted call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
	pub call: AuthorizedCall,
	pub source: CallSource,
	/// Nonce consumed by the call; `None` for direct calls.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	/// Unix timestamp (seconds) at which the call was dispatched.
	pub recorded_at: u64,
}
