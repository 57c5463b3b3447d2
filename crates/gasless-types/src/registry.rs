//! Registration contract for pluggable backends.

/// Implemented by the `Registry` struct of every backend module.
///
/// `NAME` is the key the backend is selected by in TOML, for example
/// `storage.implementations.file` or `account.implementations.local`.
pub trait ImplementationRegistry {
	const NAME: &'static str;

	/// Factory signature of the backend family (storage, account, ...).
	type Factory;

	fn factory() -> Self::Factory;
}
