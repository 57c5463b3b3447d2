//! Utility functions shared across the gasless crates.
//!
//! EIP-712 hashing lives here alongside small formatting helpers used for
//! hex handling and log output.

pub mod eip712;
pub mod formatting;

pub use eip712::{
	compute_final_digest, hash_struct, typed_data_digest, Eip712AbiEncoder, Eip712Error,
	Eip712Value, FieldKind, TypeSchema, TypedField, TypedMessage, AUTHORIZATION_SCHEMA,
	AUTHORIZATION_TYPE, DOMAIN_SCHEMA, DOMAIN_TYPE,
};
pub use formatting::{short_address, truncate_id, with_0x_prefix, without_0x_prefix};
