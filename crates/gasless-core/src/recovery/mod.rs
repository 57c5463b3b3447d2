//! Signer recovery from a digest and signature components.
//!
//! Recovery is total over structurally valid input: any `(r, s, v)` that
//! passes the checks below yields *some* address. Whether that address is
//! the claimed sender is decided by the dispatcher, never here.

use alloy_primitives::{uint, Address, Signature, B256, U256};
use gasless_types::SignatureParts;
use thiserror::Error;

/// Half the secp256k1 group order. Signatures with `s` above this are
/// rejected (EIP-2).
pub const SECP256K1_HALF_ORDER: U256 =
	uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Structural problems with signature components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecoveryError {
	#[error("invalid recovery id {0}")]
	InvalidRecoveryId(u8),
	#[error("r is zero")]
	ZeroR,
	#[error("s is zero")]
	ZeroS,
	#[error("s is not in the lower half of the curve order")]
	HighS,
	/// The curve library refused the components, e.g. `r` is not an
	/// x-coordinate on secp256k1.
	#[error("{0}")]
	Curve(String),
}

/// Recovers the address that produced `signature` over `digest`.
pub fn recover_signer(digest: &B256, signature: &SignatureParts) -> Result<Address, RecoveryError> {
	let y_parity = signature
		.y_parity()
		.map_err(|_| RecoveryError::InvalidRecoveryId(signature.v))?;

	let r = U256::from_be_bytes(signature.r.0);
	let s = U256::from_be_bytes(signature.s.0);
	if r.is_zero() {
		return Err(RecoveryError::ZeroR);
	}
	if s.is_zero() {
		return Err(RecoveryError::ZeroS);
	}
	if s > SECP256K1_HALF_ORDER {
		return Err(RecoveryError::HighS);
	}

	Signature::new(r, s, y_parity)
		.recover_address_from_prehash(digest)
		.map_err(|e| RecoveryError::Curve(e.to_string()))
}
