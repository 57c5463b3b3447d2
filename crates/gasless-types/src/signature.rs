//! Signature codec.
//!
//! Splits a 65-byte `r || s || v` signature into its components and
//! normalises the recovery id. No cryptography happens here; whether the
//! components recover to anyone is decided by the recoverer.

use crate::utils::without_0x_prefix;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while decoding signature components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureCodecError {
	#[error("Invalid signature length: expected 65 bytes, got {0}")]
	InvalidLength(usize),
	#[error("Invalid signature hex: {0}")]
	InvalidHex(String),
	/// `v` is not one of 0, 1, 27 or 28.
	#[error("Invalid recovery id: {0}")]
	InvalidRecoveryId(u8),
	#[error("Missing signature: provide either `signature` or all of `v`, `r`, `s`")]
	MissingComponents,
}

/// An ECDSA signature as `(r, s, v)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureParts {
	pub r: B256,
	pub s: B256,
	pub v: u8,
}

impl SignatureParts {
	/// Byte length of the packed `r || s || v` form.
	pub const LENGTH: usize = 65;

	pub fn new(r: B256, s: B256, v: u8) -> Self {
		Self { r, s, v }
	}

	/// Decodes packed `r (32) || s (32) || v (1)` bytes.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureCodecError> {
		if bytes.len() != Self::LENGTH {
			return Err(SignatureCodecError::InvalidLength(bytes.len()));
		}
		Ok(Self {
			r: B256::from_slice(&bytes[0..32]),
			s: B256::from_slice(&bytes[32..64]),
			v: bytes[64],
		})
	}

	/// Decodes the hex string a wallet returns from `eth_signTypedData_v4`.
	pub fn from_hex(signature: &str) -> Result<Self, SignatureCodecError> {
		let bytes = hex::decode(without_0x_prefix(signature.trim()))
			.map_err(|e| SignatureCodecError::InvalidHex(e.to_string()))?;
		Self::from_bytes(&bytes)
	}

	pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
		let mut out = [0u8; Self::LENGTH];
		out[0..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(self.to_bytes()))
	}

	/// Returns the y-parity bit encoded by `v`.
	///
	/// Accepts both the legacy 27/28 form and the raw 0/1 form.
	pub fn y_parity(&self) -> Result<bool, SignatureCodecError> {
		match self.v {
			0 | 27 => Ok(false),
			1 | 28 => Ok(true),
			other => Err(SignatureCodecError::InvalidRecoveryId(other)),
		}
	}
}

impl fmt::Debug for SignatureParts {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SignatureParts")
			.field("r", &format!("{:#x}", self.r))
			.field("s", &format!("{:#x}", self.s))
			.field("v", &self.v)
			.finish()
	}
}
