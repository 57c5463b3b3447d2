//! Authorization core for gasless (relayed) calls.
//!
//! A sender signs an EIP-712 `SomeFunc` message off-band; a relayer submits
//! it with the signature and the [`Dispatcher`] decides whether to run the
//! authorized action on the sender's behalf. The pieces:
//!
//! - [`recovery`] recovers the signing address from a digest and `(r, s, v)`
//! - [`nonce`] keeps one replay counter per signer over [`StorageService`]
//! - [`deadline`] compares a deadline to an injectable [`Clock`]
//! - [`dispatcher`] runs the gates in order and triggers the action once
//! - [`builder`] assembles a [`GaslessEngine`] from configuration
//!
//! [`StorageService`]: gasless_storage::StorageService

pub mod action;
pub mod builder;
pub mod deadline;
pub mod dispatcher;
pub mod engine;
pub mod nonce;
pub mod recovery;

pub use action::{ActionError, AuthorizedAction, LoggingAction};
pub use builder::{BuilderError, GaslessBuilder, GaslessFactories};
pub use deadline::{Clock, DeadlineError, DeadlineGuard, FixedClock, SystemClock};
pub use dispatcher::{
	AuthSource, AuthorizationError, DispatchStage, Dispatcher, SignatureProof,
};
pub use engine::{event_bus::EventBus, EngineError, GaslessEngine};
pub use nonce::{NonceError, NonceRegistry};
pub use recovery::{recover_signer, RecoveryError};
