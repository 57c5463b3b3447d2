//! Read-only endpoints a wallet calls before signing.

use alloy_primitives::Address;
use gasless_core::GaslessEngine;
use gasless_types::{APIError, DomainResponse, NonceResponse};
use std::str::FromStr;

/// Handles GET /api/domain.
pub fn get_domain(engine: &GaslessEngine) -> DomainResponse {
	let domain = engine.domain();
	DomainResponse {
		name: domain.name.clone(),
		version: domain.version.clone(),
		chain_id: domain.chain_id,
		verifying_contract: domain.verifying_contract,
		separator: engine.domain_separator(),
	}
}

/// Handles GET /api/nonces/{address}.
pub async fn get_nonce(address: &str, engine: &GaslessEngine) -> Result<NonceResponse, APIError> {
	let address = Address::from_str(address).map_err(|e| APIError::BadRequest {
		error_type: "INVALID_ADDRESS".to_string(),
		message: format!("Invalid address '{}': {}", address, e),
		details: None,
	})?;

	let nonce = engine
		.dispatcher()
		.current_nonce(&address)
		.await
		.map_err(|e| APIError::InternalServerError {
			error_type: "STORAGE_ERROR".to_string(),
			message: e.to_string(),
		})?;

	Ok(NonceResponse {
		address,
		nonce: nonce.to_string(),
	})
}
