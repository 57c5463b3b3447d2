//! Builder for constructing a [`GaslessEngine`] from configuration.
//!
//! Storage backends are created through factory functions keyed by the
//! implementation names used in `[storage.implementations]`. The payload
//! action and clock are injectable and default to [`LoggingAction`] and
//! [`SystemClock`].

use crate::action::{AuthorizedAction, LoggingAction};
use crate::deadline::{Clock, SystemClock};
use crate::dispatcher::Dispatcher;
use crate::engine::{event_bus::EventBus, GaslessEngine};
use gasless_config::Config;
use gasless_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

const EVENT_BUS_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct GaslessFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

pub struct GaslessBuilder {
	config: Config,
	action: Option<Arc<dyn AuthorizedAction>>,
	clock: Option<Arc<dyn Clock>>,
}

impl GaslessBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			action: None,
			clock: None,
		}
	}

	/// Sets the side effect run for each accepted call.
	pub fn with_action(mut self, action: Arc<dyn AuthorizedAction>) -> Self {
		self.action = Some(action);
		self
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	pub async fn build<SF>(self, factories: GaslessFactories<SF>) -> Result<GaslessEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let domain = self
			.config
			.signing_domain()
			.map_err(|e| BuilderError::Config(e.to_string()))?;
		let domain_separator = domain
			.separator()
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		// Only the primary backend is instantiated; the others are inert config.
		let primary_storage = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(primary_storage)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					primary_storage
				))
			})?;
		let factory = factories.storage_factories.get(primary_storage).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"No factory registered for storage '{}'",
				primary_storage
			))
		})?;

		let storage_backend = match factory(storage_config) {
			Ok(implementation) => {
				tracing::info!(component = "storage", implementation = %primary_storage, "Loaded");
				implementation
			}
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary_storage,
					error = %e,
					"Failed to create storage implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create storage implementation '{}': {}",
					primary_storage, e
				)));
			}
		};
		let storage = Arc::new(StorageService::new(storage_backend));

		let action = self.action.unwrap_or_else(|| Arc::new(LoggingAction));
		let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
		let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

		let dispatcher = Arc::new(Dispatcher::new(
			domain_separator,
			storage.clone(),
			action,
			clock,
			event_bus.clone(),
		));

		tracing::info!(
			component = "dispatcher",
			domain = %domain.name,
			chain_id = domain.chain_id,
			verifying_contract = %domain.verifying_contract,
			"Loaded"
		);

		Ok(GaslessEngine::new(
			self.config,
			domain,
			storage,
			dispatcher,
			event_bus,
		))
	}
}
