//! Configuration for the gasless authorization service.
//!
//! Configuration is read from TOML. `${VAR}` and `${VAR:-default}` references
//! are resolved against the environment before parsing, and the result is
//! validated before it is handed to the engine builder.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(feature = "testing")]
pub mod builders;
mod loader;

use alloy_primitives::Address;
use gasless_types::Domain;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message; the full error echoes the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// EIP-712 domain every signature is bound to.
	pub domain: DomainConfig,
	/// Backend holding nonces and authorization records.
	pub storage: StorageConfig,
	/// Signer used by the `sign` helper. Not needed to verify.
	pub account: Option<AccountConfig>,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this service instance, used in logs.
	pub id: String,
}

/// The `[domain]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	/// Address of the verifying authority, as a hex string.
	pub verifying_contract: String,
}

impl DomainConfig {
	/// Parses the section into a [`Domain`].
	pub fn to_domain(&self) -> Result<Domain, ConfigError> {
		let verifying_contract = Address::from_str(&self.verifying_contract).map_err(|e| {
			ConfigError::Validation(format!(
				"Invalid domain verifying_contract '{}': {}",
				self.verifying_contract, e
			))
		})?;
		Ok(Domain::new(
			self.name.clone(),
			self.version.clone(),
			self.chain_id,
			verifying_contract,
		))
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_max_request_size() -> usize {
	64 * 1024
}

/// Resolves `${VAR}` and `${VAR:-default}` references in `input`.
///
/// Input is capped at 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		result.push_str(&input[last..whole.start()]);
		result.push_str(&value);
		last = whole.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Parsed signing domain. Always succeeds on a validated config.
	pub fn signing_domain(&self) -> Result<Domain, ConfigError> {
		self.domain.to_domain()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.domain.name.is_empty() {
			return Err(ConfigError::Validation("Domain name cannot be empty".into()));
		}
		if self.domain.version.is_empty() {
			return Err(ConfigError::Validation(
				"Domain version cannot be empty".into(),
			));
		}
		if self.domain.chain_id == 0 {
			return Err(ConfigError::Validation(
				"Domain chain_id must be greater than 0".into(),
			));
		}
		self.domain.to_domain()?;

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if let Some(account) = &self.account {
			if !account.implementations.contains_key(&account.primary) {
				return Err(ConfigError::Validation(format!(
					"Primary account '{}' not found in implementations",
					account.primary
				)));
			}
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation(
					"API port must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses and validates a configuration string after resolving env vars.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[service]
id = "gasless-test"

[domain]
name = "Gasless"
version = "1"
chain_id = 31337
verifying_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("GASLESS_TEST_HOST", "localhost");
		std::env::set_var("GASLESS_TEST_PORT", "5432");

		let input = "host = \"${GASLESS_TEST_HOST}:${GASLESS_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("GASLESS_TEST_HOST");
		std::env::remove_var("GASLESS_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${GASLESS_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${GASLESS_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("GASLESS_MISSING_VAR"));
	}

	#[test]
	fn test_oversized_input_rejected() {
		let input = "#".repeat(1024 * 1024 + 1);
		assert!(matches!(
			resolve_env_vars(&input),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_minimal_config() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.service.id, "gasless-test");
		assert!(config.account.is_none());
		assert!(config.api.is_none());

		let domain = config.signing_domain().unwrap();
		assert_eq!(domain.name, "Gasless");
		assert_eq!(domain.chain_id, 31337);
	}

	#[test]
	fn test_full_config_with_env_vars() {
		std::env::set_var("GASLESS_TEST_SERVICE_ID", "relay-7");

		let config_str = r#"
[service]
id = "${GASLESS_TEST_SERVICE_ID}"

[domain]
name = "Gasless"
version = "1"
chain_id = 31337
verifying_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data"

[account]
primary = "local"
[account.implementations.local]
private_key = "${GASLESS_TEST_KEY:-0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80}"

[api]
enabled = true
port = 8080
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.service.id, "relay-7");
		assert_eq!(config.storage.primary, "file");
		let api = config.api.unwrap();
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
		assert_eq!(api.max_request_size, 64 * 1024);

		std::env::remove_var("GASLESS_TEST_SERVICE_ID");
	}

	#[test]
	fn test_invalid_verifying_contract() {
		let config_str = BASE.replace(
			"0x5FbDB2315678afecb367f032d93F642f64180aa3",
			"not-an-address",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("verifying_contract"));
	}

	#[test]
	fn test_zero_chain_id_rejected() {
		let config_str = BASE.replace("chain_id = 31337", "chain_id = 0");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("chain_id"));
	}

	#[test]
	fn test_unknown_primary_storage() {
		let config_str = BASE.replace("primary = \"memory\"", "primary = \"redis\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'redis' not found in implementations"));
	}

	#[test]
	fn test_unknown_primary_account() {
		let config_str = format!(
			"{}\n[account]\nprimary = \"kms\"\n[account.implementations.local]\nprivate_key = \"0x00\"\n",
			BASE
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Primary account 'kms'"));
	}

	#[test]
	fn test_empty_service_id() {
		let config_str = BASE.replace("id = \"gasless-test\"", "id = \"\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Service ID cannot be empty"));
	}
}
