//! Events published on the gasless event bus.
//!
//! Subscribers (audit sinks, metrics exporters, the HTTP layer) observe the
//! outcome of every dispatch without coupling to the dispatcher itself.

use crate::AuthorizedCall;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GaslessEvent {
	/// A call passed every gate and its action ran.
	Authorized(AuthorizedCall),
	/// A call was turned away before its action ran.
	Rejected {
		/// Sender the call claimed to act for.
		sender: Address,
		/// Display form of the rejection error.
		reason: String,
	},
}
