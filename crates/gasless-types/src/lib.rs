//! Shared types for the gasless authorization service.
//!
//! Holds the EIP-712 domain and message types, the signature codec, the
//! API request/response shapes and the configuration validation framework
//! used by every backend crate.

/// API types for HTTP endpoints.
pub mod api;
/// Authorization messages, accepted calls and audit records.
pub mod authorization;
/// EIP-712 signing domain.
pub mod domain;
/// Event types published on the event bus.
pub mod events;
/// Registration contract for pluggable backends.
pub mod registry;
/// Redacting wrapper for secrets.
pub mod secret_string;
/// Signature component codec.
pub mod signature;
/// Storage namespaces.
pub mod storage;
/// EIP-712 hashing and formatting helpers.
pub mod utils;
/// Configuration validation types.
pub mod validation;

pub use api::*;
pub use authorization::*;
pub use domain::Domain;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use signature::{SignatureCodecError, SignatureParts};
pub use storage::StorageKey;
pub use utils::{
	compute_final_digest, hash_struct, short_address, truncate_id, typed_data_digest,
	with_0x_prefix, without_0x_prefix, Eip712Error, Eip712Value, TypedMessage,
};
pub use validation::*;
