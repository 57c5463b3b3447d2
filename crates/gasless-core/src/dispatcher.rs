//! Authorization dispatcher.
//!
//! Two entry points feed one pipeline. A direct call is authenticated by the
//! host (the caller *is* the sender). A delegated call carries a signature
//! over an [`AuthorizationMessage`] that the dispatcher assembles itself,
//! using the sender's current registry nonce, and must pass these gates in
//! order:
//!
//! 1. digest computed from the assembled message
//! 2. signer recovered from the digest
//! 3. recovered signer equals the claimed sender (`InvalidSignature`)
//! 4. deadline not passed (`Expired`)
//! 5. nonce consumed atomically (`NonceMismatch`)
//!
//! Because the nonce is hashed in step 1, replaying a consumed authorization
//! recovers a different address and is rejected as `InvalidSignature`.
//!
//! Delegated calls from one sender are serialized from the nonce read until
//! the action settles, so a failed action can always hand its nonce back.
//!
//! Both paths then converge on [`Dispatcher::dispatch`], which runs the
//! payload action, persists an [`AuthorizationRecord`] and publishes
//! [`GaslessEvent::Authorized`] exactly once.

use crate::action::AuthorizedAction;
use crate::deadline::{Clock, DeadlineGuard};
use crate::engine::event_bus::EventBus;
use crate::nonce::{NonceError, NonceRegistry};
use crate::recovery::recover_signer;
use alloy_primitives::{Address, B256, U256};
use dashmap::DashMap;
use gasless_storage::StorageService;
use gasless_types::{
	short_address, truncate_id, AuthorizationMessage, AuthorizationRecord, AuthorizedCall,
	CallSource, GaslessEvent, SignatureParts, StorageKey,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorizationError {
	#[error("EIP712: Invalid signature")]
	InvalidSignature,
	#[error("EIP712: Expired")]
	Expired,
	#[error("EIP712: Malformed signature: {0}")]
	MalformedSignature(String),
	#[error("EIP712: Nonce mismatch (expected {expected}, got {supplied})")]
	NonceMismatch { expected: U256, supplied: U256 },
	#[error("Action error: {0}")]
	Action(String),
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Encoding error: {0}")]
	Encoding(String),
}

impl From<NonceError> for AuthorizationError {
	fn from(err: NonceError) -> Self {
		match err {
			NonceError::Mismatch { expected, supplied } => {
				AuthorizationError::NonceMismatch { expected, supplied }
			}
			other => AuthorizationError::Storage(other.to_string()),
		}
	}
}

/// Evidence behind a recovered identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProof {
	pub digest: B256,
	pub signature: SignatureParts,
	/// Registry nonce the digest was built with; consumed on dispatch.
	pub nonce: U256,
}

/// Who the sender is and how we know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSource {
	CallerIdentity(Address),
	RecoveredIdentity {
		identity: Address,
		proof: SignatureProof,
	},
}

impl AuthSource {
	pub fn identity(&self) -> Address {
		match self {
			AuthSource::CallerIdentity(identity) => *identity,
			AuthSource::RecoveredIdentity { identity, .. } => *identity,
		}
	}

	pub fn call_source(&self) -> CallSource {
		match self {
			AuthSource::CallerIdentity(_) => CallSource::Direct,
			AuthSource::RecoveredIdentity { .. } => CallSource::Delegated,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
	Start,
	DigestComputed,
	SignerRecovered,
	IdentityChecked,
	DeadlineChecked,
	NonceConsumed,
	Dispatched,
}

impl DispatchStage {
	pub fn as_str(&self) -> &'static str {
		match self {
			DispatchStage::Start => "start",
			DispatchStage::DigestComputed => "digest_computed",
			DispatchStage::SignerRecovered => "signer_recovered",
			DispatchStage::IdentityChecked => "identity_checked",
			DispatchStage::DeadlineChecked => "deadline_checked",
			DispatchStage::NonceConsumed => "nonce_consumed",
			DispatchStage::Dispatched => "dispatched",
		}
	}
}

impl fmt::Display for DispatchStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

fn advance(stage: &mut DispatchStage, next: DispatchStage) {
	tracing::debug!(from = %stage, to = %next, "Stage transition");
	*stage = next;
}

pub struct Dispatcher {
	domain_separator: B256,
	nonces: NonceRegistry,
	storage: Arc<StorageService>,
	action: Arc<dyn AuthorizedAction>,
	clock: Arc<dyn Clock>,
	event_bus: EventBus,
	signer_locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl Dispatcher {
	pub fn new(
		domain_separator: B256,
		storage: Arc<StorageService>,
		action: Arc<dyn AuthorizedAction>,
		clock: Arc<dyn Clock>,
		event_bus: EventBus,
	) -> Self {
		Self {
			domain_separator,
			nonces: NonceRegistry::new(storage.clone()),
			storage,
			action,
			clock,
			event_bus,
			signer_locks: DashMap::new(),
		}
	}

	fn signer_lock(&self, sender: &Address) -> Arc<Mutex<()>> {
		self.signer_locks.entry(*sender).or_default().clone()
	}

	pub fn domain_separator(&self) -> B256 {
		self.domain_separator
	}

	/// The nonce the next delegated call from `identity` must be signed with.
	pub async fn current_nonce(&self, identity: &Address) -> Result<U256, AuthorizationError> {
		Ok(self.nonces.expected_nonce(identity).await?)
	}

	/// Dispatches a call whose sender is the authenticated `caller`.
	///
	/// Never touches the nonce registry.
	#[instrument(skip_all, fields(sender = %short_address(&caller)))]
	pub async fn direct_call(
		&self,
		caller: Address,
		receivers: Vec<Address>,
		amount: U256,
	) -> Result<AuthorizationRecord, AuthorizationError> {
		let mut stage = DispatchStage::Start;
		let result = self
			.dispatch(&mut stage, AuthSource::CallerIdentity(caller), receivers, amount)
			.await;
		result.map_err(|e| self.reject(caller, stage, e))
	}

	/// Dispatches a call submitted on behalf of `sender`, authenticated by
	/// `signature` over the message built from these arguments and the
	/// sender's current nonce.
	#[instrument(skip_all, fields(sender = %short_address(&sender)))]
	pub async fn delegated_call(
		&self,
		sender: Address,
		receivers: Vec<Address>,
		amount: U256,
		deadline: U256,
		signature: SignatureParts,
	) -> Result<AuthorizationRecord, AuthorizationError> {
		let lock = self.signer_lock(&sender);
		let _guard = lock.lock().await;

		let mut stage = DispatchStage::Start;
		let result = match self
			.verify(&mut stage, sender, &receivers, amount, deadline, &signature)
			.await
		{
			Ok(source) => self.dispatch(&mut stage, source, receivers, amount).await,
			Err(e) => Err(e),
		};
		result.map_err(|e| self.reject(sender, stage, e))
	}

	/// Runs gates 1 to 4 for a delegated call.
	async fn verify(
		&self,
		stage: &mut DispatchStage,
		sender: Address,
		receivers: &[Address],
		amount: U256,
		deadline: U256,
		signature: &SignatureParts,
	) -> Result<AuthSource, AuthorizationError> {
		let nonce = self.current_nonce(&sender).await?;
		let message = AuthorizationMessage {
			sender,
			receivers: receivers.to_vec(),
			amount,
			deadline,
			nonce,
		};
		let digest = message
			.signing_digest(&self.domain_separator)
			.map_err(|e| AuthorizationError::Encoding(e.to_string()))?;
		advance(stage, DispatchStage::DigestComputed);

		let identity = recover_signer(&digest, signature)
			.map_err(|e| AuthorizationError::MalformedSignature(e.to_string()))?;
		advance(stage, DispatchStage::SignerRecovered);

		if identity != sender {
			tracing::debug!(
				recovered = %short_address(&identity),
				digest = %truncate_id(&digest.to_string()),
				"Recovered signer differs from sender"
			);
			return Err(AuthorizationError::InvalidSignature);
		}
		advance(stage, DispatchStage::IdentityChecked);

		DeadlineGuard::check(deadline, self.clock.now())
			.map_err(|_| AuthorizationError::Expired)?;
		advance(stage, DispatchStage::DeadlineChecked);

		Ok(AuthSource::RecoveredIdentity {
			identity,
			proof: SignatureProof {
				digest,
				signature: *signature,
				nonce,
			},
		})
	}

	async fn dispatch(
		&self,
		stage: &mut DispatchStage,
		source: AuthSource,
		receivers: Vec<Address>,
		amount: U256,
	) -> Result<AuthorizationRecord, AuthorizationError> {
		let sender = source.identity();

		let consumed = match &source {
			AuthSource::CallerIdentity(_) => None,
			AuthSource::RecoveredIdentity { identity, proof } => {
				self.nonces.consume(identity, proof.nonce).await?;
				advance(stage, DispatchStage::NonceConsumed);
				Some(proof.nonce)
			}
		};

		let call = AuthorizedCall {
			sender,
			receivers,
			amount,
		};

		if let Err(e) = self.action.execute(&call).await {
			if let Some(nonce) = consumed {
				if let Err(release_err) = self.nonces.release(&sender, nonce).await {
					tracing::error!(
						nonce = %nonce,
						error = %release_err,
						"Failed to release nonce after action failure"
					);
				}
			}
			return Err(AuthorizationError::Action(e.to_string()));
		}
		advance(stage, DispatchStage::Dispatched);

		let record = AuthorizationRecord {
			call: call.clone(),
			source: source.call_source(),
			nonce: consumed.map(|n| n.to_string()),
			recorded_at: self.clock.now(),
		};

		// The action already ran; a lost audit record must not undo the call.
		let record_id = uuid::Uuid::new_v4().to_string();
		if let Err(e) = self
			.storage
			.store(StorageKey::Authorizations.as_str(), &record_id, &record)
			.await
		{
			tracing::error!(
				record_id = %truncate_id(&record_id),
				error = %e,
				"Failed to persist authorization record"
			);
		}

		self.event_bus.publish(GaslessEvent::Authorized(call)).ok();

		tracing::info!(
			source = ?record.source,
			nonce = record.nonce.as_deref().unwrap_or("-"),
			receivers = record.call.receivers.len(),
			amount = %record.call.amount,
			"Call authorized"
		);

		Ok(record)
	}

	fn reject(
		&self,
		sender: Address,
		stage: DispatchStage,
		error: AuthorizationError,
	) -> AuthorizationError {
		tracing::warn!(stage = %stage, reason = %error, "Call rejected");
		self.event_bus
			.publish(GaslessEvent::Rejected {
				sender,
				reason: error.to_string(),
			})
			.ok();
		error
	}
}
