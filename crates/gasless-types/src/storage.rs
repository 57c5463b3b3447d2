//! Storage namespaces used by the gasless service.

use std::str::FromStr;

/// Namespaces under which the service persists data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Per-sender nonce counters, stored as decimal strings.
	Nonces,
	/// Audit records of accepted calls.
	Authorizations,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Nonces => "nonces",
			StorageKey::Authorizations => "authorizations",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Nonces, Self::Authorizations].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"nonces" => Ok(Self::Nonces),
			"authorizations" => Ok(Self::Authorizations),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
