//! `gasless sign`: produce a relayable request with the configured account.

use alloy_primitives::{Address, U256};
use gasless_account::AccountService;
use gasless_core::{Clock, GaslessEngine, SystemClock};
use gasless_types::{AuthorizationMessage, DelegatedCallRequest};
use std::str::FromStr;

/// Parses `A,B,...` into addresses. An empty string means no receivers.
pub fn parse_receivers(raw: &str) -> Result<Vec<Address>, Box<dyn std::error::Error>> {
	let mut receivers = Vec::new();
	for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
		let address = Address::from_str(entry)
			.map_err(|e| format!("Invalid receiver '{}': {}", entry, e))?;
		receivers.push(address);
	}
	Ok(receivers)
}

/// Signs a `SomeFunc` message at the account's current nonce.
pub async fn sign_request(
	engine: &GaslessEngine,
	account: &AccountService,
	receivers: Vec<Address>,
	amount: U256,
	deadline: U256,
) -> Result<DelegatedCallRequest, Box<dyn std::error::Error>> {
	let sender = account.get_address().await?;
	let nonce = engine.dispatcher().current_nonce(&sender).await?;

	let message = AuthorizationMessage {
		sender,
		receivers,
		amount,
		deadline,
		nonce,
	};
	let signature = account
		.sign_authorization(&engine.domain_separator(), &message)
		.await?;

	tracing::info!(nonce = %nonce, deadline = %deadline, "Signed authorization");

	Ok(DelegatedCallRequest {
		sender,
		receivers: message.receivers,
		amount,
		deadline,
		signature: Some(signature.to_hex()),
		v: None,
		r: None,
		s: None,
	})
}

/// Deadline `seconds` from now on the wall clock.
pub fn deadline_in(seconds: u64) -> U256 {
	U256::from(SystemClock.now()) + U256::from(seconds)
}
