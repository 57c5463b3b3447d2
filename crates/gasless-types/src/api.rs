//! API types for the gasless HTTP surface.
//!
//! Relayers submit signed authorizations as [`DelegatedCallRequest`]s and
//! wallets read the domain and current nonce before signing.

use crate::{SignatureCodecError, SignatureParts};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/authorizations`.
///
/// The signature may be given either packed (`signature`) or split into
/// `v`, `r` and `s`. When both are present the packed form wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegatedCallRequest {
	pub sender: Address,
	pub receivers: Vec<Address>,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	#[serde(with = "u256_serde")]
	pub deadline: U256,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub v: Option<u8>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub r: Option<B256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub s: Option<B256>,
}

impl DelegatedCallRequest {
	/// Extracts the signature components from whichever form was supplied.
	pub fn signature_parts(&self) -> Result<SignatureParts, SignatureCodecError> {
		if let Some(signature) = &self.signature {
			return SignatureParts::from_hex(signature);
		}
		match (self.v, self.r, self.s) {
			(Some(v), Some(r), Some(s)) => Ok(SignatureParts::new(r, s, v)),
			_ => Err(SignatureCodecError::MissingComponents),
		}
	}
}

/// Result of an accepted call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
	pub sender: Address,
	pub receivers: Vec<Address>,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// Nonce consumed by a delegated call.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
}

/// Response of `GET /api/nonces/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResponse {
	pub address: Address,
	/// Next nonce the address must sign, as a decimal string.
	pub nonce: String,
}

/// Response of `GET /api/domain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainResponse {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: Address,
	pub separator: B256,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Request could not be decoded (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Signature did not authorize the sender (401)
	Unauthorized { error_type: String, message: String },
	/// Well-formed request refused by a gate or the action (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => (error_type, message, details.clone()),
			APIError::Unauthorized {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message, None),
		};
		ErrorResponse {
			error: error.clone(),
			message: message.clone(),
			details,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

/// Serde module for U256 amounts.
///
/// Serializes as a decimal string. Accepts decimal strings, `0x`-prefixed
/// hex strings and plain JSON integers.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Number(u64),
	}

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Raw::deserialize(deserializer)? {
			Raw::Number(n) => Ok(U256::from(n)),
			Raw::Text(s) => {
				let s = s.trim();
				match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
					Some(hex) => U256::from_str_radix(hex, 16),
					None => U256::from_str_radix(s, 10),
				}
				.map_err(D::Error::custom)
			},
		}
	}
}
