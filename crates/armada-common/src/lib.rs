//! Common types for Armada: errors, state polling, and telemetry

#![deny(missing_docs)]

use std::time::Duration;

pub mod error;
pub mod poll;
pub mod telemetry;

pub use error::Error;
pub use poll::{Observed, PollConfig, StatePoller};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Minimum interval between consecutive state polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Delay before the first state poll after a mutating call
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(30);

/// Default overall deadline for an asynchronous operation
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
