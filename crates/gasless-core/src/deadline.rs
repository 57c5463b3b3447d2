//! Deadline enforcement and the clock it reads.

use alloy_primitives::U256;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeadlineError {
	#[error("deadline {deadline} passed at {now}")]
	Expired { deadline: U256, now: u64 },
}

/// Source of the current unix time in seconds.
pub trait Clock: Send + Sync {
	fn now(&self) -> u64;
}

/// Wall clock (UTC).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> u64 {
		u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
	}
}

/// Settable clock for tests.
#[derive(Debug, Default)]
pub struct FixedClock(AtomicU64);

impl FixedClock {
	pub fn new(now: u64) -> Self {
		Self(AtomicU64::new(now))
	}

	pub fn set(&self, now: u64) {
		self.0.store(now, Ordering::SeqCst);
	}

	pub fn advance(&self, seconds: u64) {
		self.0.fetch_add(seconds, Ordering::SeqCst);
	}
}

impl Clock for FixedClock {
	fn now(&self) -> u64 {
		self.0.load(Ordering::SeqCst)
	}
}

pub struct DeadlineGuard;

impl DeadlineGuard {
	/// Expired iff `now > deadline`; a call landing exactly on its deadline
	/// is still valid.
	pub fn check(deadline: U256, now: u64) -> Result<(), DeadlineError> {
		if U256::from(now) > deadline {
			return Err(DeadlineError::Expired { deadline, now });
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_boundary_is_inclusive() {
		let deadline = U256::from(1_000u64);
		assert!(DeadlineGuard::check(deadline, 999).is_ok());
		assert!(DeadlineGuard::check(deadline, 1_000).is_ok());
		assert_eq!(
			DeadlineGuard::check(deadline, 1_001),
			Err(DeadlineError::Expired {
				deadline,
				now: 1_001
			})
		);
	}

	#[test]
	fn test_far_future_deadline() {
		assert!(DeadlineGuard::check(U256::MAX, u64::MAX).is_ok());
		assert!(DeadlineGuard::check(U256::ZERO, 1).is_err());
		assert!(DeadlineGuard::check(U256::ZERO, 0).is_ok());
	}

	#[test]
	fn test_fixed_clock() {
		let clock = FixedClock::new(100);
		assert_eq!(clock.now(), 100);
		clock.advance(86_400);
		assert_eq!(clock.now(), 86_500);
		clock.set(5);
		assert_eq!(clock.now(), 5);
	}

	#[test]
	fn test_system_clock_is_recent() {
		// 2023-01-01T00:00:00Z
		assert!(SystemClock.now() > 1_672_531_200);
	}
}
