//! Fluent construction of `Config` values for tests.

use crate::{ApiConfig, Config, DomainConfig, ServiceConfig, StorageConfig};
use std::collections::HashMap;

/// Builds a valid in-memory [`Config`] with local-devnet defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	domain: DomainConfig,
	storage_primary: String,
	storage_config: toml::Value,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "gasless-test".to_string(),
			domain: DomainConfig {
				name: "Gasless".to_string(),
				version: "1".to_string(),
				chain_id: 31337,
				verifying_contract: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
			},
			storage_primary: "memory".to_string(),
			storage_config: toml::Value::Table(toml::map::Map::new()),
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn domain(
		mut self,
		name: impl Into<String>,
		version: impl Into<String>,
		chain_id: u64,
		verifying_contract: impl Into<String>,
	) -> Self {
		self.domain = DomainConfig {
			name: name.into(),
			version: version.into(),
			chain_id,
			verifying_contract: verifying_contract.into(),
		};
		self
	}

	/// Selects the primary storage backend and its table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		let mut implementations = HashMap::new();
		implementations.insert(self.storage_primary.clone(), self.storage_config);

		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			domain: self.domain,
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations,
			},
			account: None,
			api: self.api,
		}
	}
}
