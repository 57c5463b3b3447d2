//! Broadcast bus for dispatch outcomes.

use gasless_types::GaslessEvent;
use tokio::sync::broadcast;

/// Multi-consumer channel carrying [`GaslessEvent`]s.
///
/// Publishing never blocks; slow subscribers observe `Lagged` and skip ahead.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<GaslessEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<GaslessEvent> {
		self.sender.subscribe()
	}

	/// Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: GaslessEvent,
	) -> Result<usize, broadcast::error::SendError<GaslessEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::Address;

	fn rejected(reason: &str) -> GaslessEvent {
		GaslessEvent::Rejected {
			sender: Address::ZERO,
			reason: reason.into(),
		}
	}

	#[tokio::test]
	async fn test_fan_out() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.clone().subscribe();

		assert_eq!(bus.publish(rejected("EIP712: Expired")).unwrap(), 2);
		assert_eq!(first.recv().await.unwrap(), rejected("EIP712: Expired"));
		assert_eq!(second.recv().await.unwrap(), rejected("EIP712: Expired"));
	}

	#[test]
	fn test_publish_without_subscribers() {
		let bus = EventBus::new(8);
		assert!(bus.publish(rejected("EIP712: Expired")).is_err());
	}
}
