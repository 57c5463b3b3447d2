//! End-to-end authorization scenarios against an engine built from config.

use alloy_primitives::{address, Address, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{eip712_domain, sol, SolStruct};
use async_trait::async_trait;
use gasless_account::{implementations::local, AccountService};
use gasless_config::builders::ConfigBuilder;
use gasless_core::{
	ActionError, AuthorizationError, AuthorizedAction, FixedClock, GaslessBuilder, GaslessEngine,
	GaslessFactories,
};
use gasless_storage::StorageFactory;
use gasless_types::{
	AuthorizationMessage, AuthorizedCall, CallSource, Domain, GaslessEvent, SignatureParts,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

sol! {
	struct SomeFunc {
		address sender;
		address[] receivers;
		uint256 amount;
		uint256 deadline;
		uint256 nonce;
	}
}

const KEY_A: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const ADDR_A: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
const ADDR_B: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
const VERIFIER: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
const NOW: u64 = 1_700_000_000;

#[derive(Default)]
struct RecordingAction {
	calls: Mutex<Vec<AuthorizedCall>>,
}

#[async_trait]
impl AuthorizedAction for RecordingAction {
	async fn execute(&self, call: &AuthorizedCall) -> Result<(), ActionError> {
		self.calls.lock().await.push(call.clone());
		Ok(())
	}
}

struct Harness {
	engine: GaslessEngine,
	action: Arc<RecordingAction>,
	clock: Arc<FixedClock>,
}

fn factories() -> GaslessFactories<StorageFactory> {
	let mut storage_factories: HashMap<String, StorageFactory> = HashMap::new();
	for (name, factory) in gasless_storage::get_all_implementations() {
		storage_factories.insert(name.to_string(), factory);
	}
	GaslessFactories { storage_factories }
}

async fn harness_with(config: gasless_config::Config) -> Harness {
	let action = Arc::new(RecordingAction::default());
	let clock = Arc::new(FixedClock::new(NOW));
	let engine = GaslessBuilder::new(config)
		.with_action(action.clone())
		.with_clock(clock.clone())
		.build(factories())
		.await
		.unwrap();
	Harness {
		engine,
		action,
		clock,
	}
}

async fn harness() -> Harness {
	harness_with(ConfigBuilder::new().build()).await
}

fn domain() -> Domain {
	Domain::new("Gasless", "1", 31337, VERIFIER)
}

fn message(sender: Address, nonce: u64, deadline: u64) -> AuthorizationMessage {
	AuthorizationMessage {
		sender,
		receivers: vec![sender],
		amount: U256::from(42u64),
		deadline: U256::from(deadline),
		nonce: U256::from(nonce),
	}
}

/// Signs through the account service, the way the `sign` helper does.
async fn sign(key: &str, separator: &B256, message: &AuthorizationMessage) -> SignatureParts {
	let config: toml::Value = toml::from_str(&format!("private_key = \"{}\"", key)).unwrap();
	let account = AccountService::new(local::create_account(&config).unwrap());
	account.sign_typed(separator, message).await.unwrap()
}

async fn submit(
	engine: &GaslessEngine,
	message: &AuthorizationMessage,
	signature: SignatureParts,
) -> Result<gasless_types::AuthorizationRecord, AuthorizationError> {
	engine
		.dispatcher()
		.delegated_call(
			message.sender,
			message.receivers.clone(),
			message.amount,
			message.deadline,
			signature,
		)
		.await
}

#[tokio::test]
async fn test_direct_call() {
	let h = harness().await;
	let mut events = h.engine.event_bus().subscribe();

	let record = h
		.engine
		.dispatcher()
		.direct_call(ADDR_A, vec![ADDR_B], U256::from(42u64))
		.await
		.unwrap();

	let expected = AuthorizedCall {
		sender: ADDR_A,
		receivers: vec![ADDR_B],
		amount: U256::from(42u64),
	};
	assert_eq!(record.call, expected);
	assert_eq!(record.source, CallSource::Direct);
	assert_eq!(events.recv().await.unwrap(), GaslessEvent::Authorized(expected.clone()));
	assert_eq!(*h.action.calls.lock().await, vec![expected]);
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::ZERO
	);
}

#[tokio::test]
async fn test_signature_from_typed_data_v4() {
	let h = harness().await;

	// What a wallet produces for eth_signTypedData_v4, including the
	// explicit EIP712Domain type, split by the relayer into r, s, v.
	let alloy_domain = eip712_domain! {
		name: "Gasless",
		version: "1",
		chain_id: 31337,
		verifying_contract: VERIFIER,
	};
	let msg = message(ADDR_A, 0, NOW + 86_400);
	let payload = SomeFunc {
		sender: msg.sender,
		receivers: msg.receivers.clone(),
		amount: msg.amount,
		deadline: msg.deadline,
		nonce: msg.nonce,
	};
	let signer: PrivateKeySigner = KEY_A.trim_start_matches("0x").parse().unwrap();
	let raw = signer
		.sign_hash_sync(&payload.eip712_signing_hash(&alloy_domain))
		.unwrap();
	let hex_signature = format!("0x{}", alloy_primitives::hex::encode(raw.as_bytes()));
	let signature = SignatureParts::from_hex(&hex_signature).unwrap();

	assert_eq!(
		h.engine.domain_separator(),
		alloy_domain.hash_struct(),
		"implicit and explicit domain types hash alike"
	);

	let record = submit(&h.engine, &msg, signature).await.unwrap();
	assert_eq!(record.source, CallSource::Delegated);
	assert_eq!(record.nonce.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_concrete_scenario_and_replay() {
	let h = harness().await;
	let separator = domain().separator().unwrap();
	let mut events = h.engine.event_bus().subscribe();

	let msg = message(ADDR_A, 0, NOW + 86_400);
	let signature = sign(KEY_A, &separator, &msg).await;

	submit(&h.engine, &msg, signature).await.unwrap();
	assert_eq!(
		events.recv().await.unwrap(),
		GaslessEvent::Authorized(AuthorizedCall {
			sender: ADDR_A,
			receivers: vec![ADDR_A],
			amount: U256::from(42u64),
		})
	);
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::from(1u64)
	);

	let err = submit(&h.engine, &msg, signature).await.unwrap_err();
	assert_eq!(err, AuthorizationError::InvalidSignature);
	assert_eq!(err.to_string(), "EIP712: Invalid signature");
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::from(1u64)
	);
	assert_eq!(h.action.calls.lock().await.len(), 1);
}

#[tokio::test]
async fn test_sequential_nonces() {
	let h = harness().await;
	let separator = domain().separator().unwrap();

	for nonce in 0..2 {
		let msg = message(ADDR_A, nonce, NOW + 60);
		let signature = sign(KEY_A, &separator, &msg).await;
		submit(&h.engine, &msg, signature).await.unwrap();
	}
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::from(2u64)
	);
	assert_eq!(h.action.calls.lock().await.len(), 2);
}

#[tokio::test]
async fn test_out_of_order_nonce() {
	let h = harness().await;
	let separator = domain().separator().unwrap();

	let first = message(ADDR_A, 0, NOW + 60);
	let second = message(ADDR_A, 1, NOW + 60);
	let first_sig = sign(KEY_A, &separator, &first).await;
	let second_sig = sign(KEY_A, &separator, &second).await;

	assert_eq!(
		submit(&h.engine, &second, second_sig).await.unwrap_err(),
		AuthorizationError::InvalidSignature
	);

	// Once the gap is filled the later authorization becomes valid.
	submit(&h.engine, &first, first_sig).await.unwrap();
	submit(&h.engine, &second, second_sig).await.unwrap();
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::from(2u64)
	);
}

#[tokio::test]
async fn test_expired_deadline() {
	let h = harness().await;
	let separator = domain().separator().unwrap();

	let msg = message(ADDR_A, 0, NOW + 10);
	let signature = sign(KEY_A, &separator, &msg).await;

	h.clock.advance(11);
	let err = submit(&h.engine, &msg, signature).await.unwrap_err();
	assert_eq!(err, AuthorizationError::Expired);
	assert_eq!(err.to_string(), "EIP712: Expired");
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::ZERO
	);

	// Exactly at the deadline is still in time.
	h.clock.set(NOW + 10);
	submit(&h.engine, &msg, signature).await.unwrap();
}

#[tokio::test]
async fn test_identity_checked_before_deadline() {
	let h = harness().await;
	let separator = domain().separator().unwrap();

	let msg = message(ADDR_A, 0, NOW - 1);
	let signature = sign(KEY_B, &separator, &message(ADDR_B, 0, NOW - 1)).await;
	assert_eq!(
		submit(&h.engine, &msg, signature).await.unwrap_err(),
		AuthorizationError::InvalidSignature
	);
}

#[tokio::test]
async fn test_wrong_domain() {
	let h = harness().await;

	let msg = message(ADDR_A, 0, NOW + 60);
	let other_contract = Domain::new(
		"Gasless",
		"1",
		31337,
		address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
	);
	let other_chain = Domain::new("Gasless", "1", 1, VERIFIER);
	let other_version = Domain::new("Gasless", "2", 31337, VERIFIER);

	for wrong in [other_contract, other_chain, other_version] {
		let signature = sign(KEY_A, &wrong.separator().unwrap(), &msg).await;
		assert_eq!(
			submit(&h.engine, &msg, signature).await.unwrap_err(),
			AuthorizationError::InvalidSignature
		);
	}
	assert!(h.action.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_wrong_signer() {
	let h = harness().await;
	let separator = domain().separator().unwrap();

	// B signs a message claiming to come from A.
	let msg = message(ADDR_A, 0, NOW + 60);
	let signature = {
		let signer: PrivateKeySigner = KEY_B.trim_start_matches("0x").parse().unwrap();
		let digest = msg.signing_digest(&separator).unwrap();
		SignatureParts::from_bytes(&signer.sign_hash_sync(&digest).unwrap().as_bytes()).unwrap()
	};

	assert_eq!(
		submit(&h.engine, &msg, signature).await.unwrap_err(),
		AuthorizationError::InvalidSignature
	);
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::ZERO
	);
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_B).await.unwrap(),
		U256::ZERO
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_consume_once() {
	let h = harness().await;
	let separator = domain().separator().unwrap();
	let msg = message(ADDR_A, 0, NOW + 60);
	let signature = sign(KEY_A, &separator, &msg).await;

	let mut handles = Vec::new();
	for _ in 0..8 {
		let engine = h.engine.clone();
		let msg = msg.clone();
		handles.push(tokio::spawn(async move {
			submit(&engine, &msg, signature).await
		}));
	}

	let mut accepted = 0;
	for handle in handles {
		match handle.await.unwrap() {
			Ok(_) => accepted += 1,
			// Losers either saw the bumped nonce before hashing or lost the swap.
			Err(AuthorizationError::InvalidSignature)
			| Err(AuthorizationError::NonceMismatch { .. }) => {}
			Err(other) => panic!("unexpected rejection: {other}"),
		}
	}
	assert_eq!(accepted, 1);
	assert_eq!(h.action.calls.lock().await.len(), 1);
}

#[tokio::test]
async fn test_nonces_survive_restart_with_file_storage() {
	let dir = tempfile::tempdir().unwrap();
	let storage_config: toml::Value = toml::from_str(&format!(
		"storage_path = \"{}\"",
		dir.path().display()
	))
	.unwrap();
	let config = ConfigBuilder::new().storage("file", storage_config).build();
	let separator = domain().separator().unwrap();

	{
		let h = harness_with(config.clone()).await;
		let msg = message(ADDR_A, 0, NOW + 60);
		let signature = sign(KEY_A, &separator, &msg).await;
		submit(&h.engine, &msg, signature).await.unwrap();
	}

	let h = harness_with(config).await;
	assert_eq!(
		h.engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::from(1u64)
	);
	let msg = message(ADDR_A, 1, NOW + 60);
	let signature = sign(KEY_A, &separator, &msg).await;
	submit(&h.engine, &msg, signature).await.unwrap();
}

/// Fails its first call after a delay; later calls succeed.
#[derive(Default)]
struct SlowFirstFailure {
	calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl AuthorizedAction for SlowFirstFailure {
	async fn execute(&self, _call: &AuthorizedCall) -> Result<(), ActionError> {
		if self
			.calls
			.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
			== 0
		{
			tokio::time::sleep(std::time::Duration::from_millis(200)).await;
			return Err(ActionError::Refused("boom".into()));
		}
		Ok(())
	}
}

#[tokio::test]
async fn test_failed_action_keeps_nonce_despite_later_submission() {
	let engine = GaslessBuilder::new(ConfigBuilder::new().build())
		.with_action(Arc::new(SlowFirstFailure::default()))
		.with_clock(Arc::new(FixedClock::new(NOW)))
		.build(factories())
		.await
		.unwrap();
	let separator = domain().separator().unwrap();

	let first = message(ADDR_A, 0, NOW + 60);
	let first_sig = sign(KEY_A, &separator, &first).await;
	let second = message(ADDR_A, 1, NOW + 60);
	let second_sig = sign(KEY_A, &separator, &second).await;

	let first_task = {
		let engine = engine.clone();
		let first = first.clone();
		tokio::spawn(async move { submit(&engine, &first, first_sig).await })
	};
	tokio::time::sleep(std::time::Duration::from_millis(50)).await;
	let second_task = {
		let engine = engine.clone();
		tokio::spawn(async move { submit(&engine, &second, second_sig).await })
	};

	let first_result = first_task.await.unwrap();
	assert!(matches!(first_result, Err(AuthorizationError::Action(_))));
	// The nonce-1 call waits for nonce 0 to settle, then hashes against 0.
	assert_eq!(
		second_task.await.unwrap().unwrap_err(),
		AuthorizationError::InvalidSignature
	);
	assert_eq!(
		engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::ZERO
	);

	let record = submit(&engine, &first, first_sig).await.unwrap();
	assert_eq!(record.nonce.as_deref(), Some("0"));
	assert_eq!(
		engine.dispatcher().current_nonce(&ADDR_A).await.unwrap(),
		U256::from(1u64)
	);
}
