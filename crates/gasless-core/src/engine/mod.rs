//! Gasless engine: the assembled dispatcher plus the services around it.
//!
//! The engine owns no request loop of its own. Hosts call into
//! [`GaslessEngine::dispatcher`]; [`GaslessEngine::run`] only drains the event
//! bus into the log until shutdown.

pub mod event_bus;
pub mod lifecycle;

use crate::dispatcher::Dispatcher;
use alloy_primitives::B256;
use gasless_config::Config;
use gasless_storage::StorageService;
use gasless_types::{short_address, Domain, GaslessEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
}

#[derive(Clone)]
pub struct GaslessEngine {
	pub(crate) config: Config,
	pub(crate) domain: Domain,
	pub(crate) storage: Arc<StorageService>,
	pub(crate) dispatcher: Arc<Dispatcher>,
	pub(crate) event_bus: event_bus::EventBus,
}

impl GaslessEngine {
	pub fn new(
		config: Config,
		domain: Domain,
		storage: Arc<StorageService>,
		dispatcher: Arc<Dispatcher>,
		event_bus: event_bus::EventBus,
	) -> Self {
		Self {
			config,
			domain,
			storage,
			dispatcher,
			event_bus,
		}
	}

	/// Logs dispatch outcomes until Ctrl-C.
	pub async fn run(&self) -> Result<(), EngineError> {
		self.initialize().await?;
		let mut events = self.event_bus.subscribe();

		loop {
			tokio::select! {
				event = events.recv() => {
					match event {
						Ok(GaslessEvent::Authorized(call)) => {
							tracing::debug!(
								sender = %short_address(&call.sender),
								amount = %call.amount,
								"Authorized call observed"
							);
						}
						Ok(GaslessEvent::Rejected { sender, reason }) => {
							tracing::debug!(sender = %short_address(&sender), %reason, "Rejection observed");
						}
						Err(RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "Event bus subscriber lagged");
						}
						Err(RecvError::Closed) => break,
					}
				}

				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		self.shutdown().await
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn domain(&self) -> &Domain {
		&self.domain
	}

	pub fn domain_separator(&self) -> B256 {
		self.dispatcher.domain_separator()
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	pub fn dispatcher(&self) -> &Arc<Dispatcher> {
		&self.dispatcher
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}
}
