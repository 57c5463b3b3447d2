//! Registry of every backend implementation linked into the binary.
//!
//! Storage and account crates self-describe through
//! `get_all_implementations()`; configuration then picks among them by name.

use gasless_account::{AccountError, AccountInterface, AccountService};
use gasless_config::Config;
use gasless_core::{GaslessBuilder, GaslessEngine, GaslessFactories};
use gasless_storage::{StorageError, StorageInterface};
use std::collections::HashMap;
use std::sync::OnceLock;

pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub account: HashMap<String, AccountFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			account: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in gasless_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in gasless_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}

		registry
	})
}

/// Picks the registered factory for every configured implementation, failing
/// on names nothing is registered under.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

pub async fn build_engine_from_config(
	config: Config,
) -> Result<GaslessEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();
	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");

	let engine = GaslessBuilder::new(config)
		.build(GaslessFactories { storage_factories })
		.await?;
	Ok(engine)
}

/// Creates the primary account from the `[account]` section.
pub fn build_account_from_config(
	config: &Config,
) -> Result<AccountService, Box<dyn std::error::Error>> {
	let account = config
		.account
		.as_ref()
		.ok_or("No [account] section configured")?;
	let registry = get_registry();
	let factories = build_factories!(registry, account.implementations, account, "account");

	let primary = &account.primary;
	let factory = factories
		.get(primary)
		.ok_or_else(|| format!("Primary account '{}' is not configured", primary))?;
	let implementation_config = account
		.implementations
		.get(primary)
		.ok_or_else(|| format!("Primary account '{}' is not configured", primary))?;

	let implementation = factory(implementation_config)?;
	tracing::info!(component = "account", implementation = %primary, "Loaded");
	Ok(AccountService::new(implementation))
}

#[cfg(test)]
mod tests {
	use super::*;
	use gasless_config::builders::ConfigBuilder;
	use gasless_config::AccountConfig;

	#[test]
	fn test_registry_contains_builtins() {
		let registry = get_registry();
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.storage.contains_key("file"));
		assert!(registry.account.contains_key("local"));
	}

	#[tokio::test]
	async fn test_build_engine_from_minimal_config() {
		let config = ConfigBuilder::new().service_id("relay-test").build();
		let engine = build_engine_from_config(config).await.unwrap();
		assert_eq!(engine.config().service.id, "relay-test");
	}

	#[tokio::test]
	async fn test_unknown_storage_implementation() {
		let config = ConfigBuilder::new()
			.storage("redis", toml::Value::Table(toml::map::Map::new()))
			.build();
		let err = build_engine_from_config(config).await.err().unwrap();
		assert!(err.to_string().contains("Unknown storage implementation 'redis'"));
		assert!(err.to_string().contains("file, memory"));
	}

	#[tokio::test]
	async fn test_build_account() {
		let mut config = ConfigBuilder::new().build();
		assert!(build_account_from_config(&config).is_err());

		let mut implementations = HashMap::new();
		implementations.insert(
			"local".to_string(),
			toml::from_str::<toml::Value>(
				"private_key = \"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80\"",
			)
			.unwrap(),
		);
		config.account = Some(AccountConfig {
			primary: "local".to_string(),
			implementations,
		});

		let account = build_account_from_config(&config).unwrap();
		assert_eq!(
			account.get_address().await.unwrap(),
			alloy_primitives::address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
		);
	}
}
