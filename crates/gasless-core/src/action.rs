//! The payload side effect run for each accepted call.
//!
//! What an authorized call *means* is up to the host. The dispatcher only
//! guarantees [`AuthorizedAction::execute`] runs at most once per accepted
//! authorization, after every gate has passed.

use async_trait::async_trait;
use gasless_types::{short_address, AuthorizedCall};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
	#[error("Action refused: {0}")]
	Refused(String),
	#[error("Action failed: {0}")]
	Failed(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizedAction: Send + Sync {
	async fn execute(&self, call: &AuthorizedCall) -> Result<(), ActionError>;
}

/// Records the call in the log and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAction;

#[async_trait]
impl AuthorizedAction for LoggingAction {
	async fn execute(&self, call: &AuthorizedCall) -> Result<(), ActionError> {
		tracing::info!(
			sender = %short_address(&call.sender),
			receivers = call.receivers.len(),
			amount = %call.amount,
			"Authorized call executed"
		);
		Ok(())
	}
}
