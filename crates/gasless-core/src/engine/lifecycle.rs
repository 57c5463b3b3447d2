//! Startup and shutdown hooks for the gasless engine.

use super::{EngineError, GaslessEngine};
use gasless_types::truncate_id;

impl GaslessEngine {
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(
			service = %self.config.service.id,
			domain = %self.domain.name,
			version = %self.domain.version,
			chain_id = self.domain.chain_id,
			separator = %truncate_id(&self.domain_separator().to_string()),
			"Initializing gasless engine"
		);
		Ok(())
	}

	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!(service = %self.config.service.id, "Shutting down gasless engine");
		Ok(())
	}
}
