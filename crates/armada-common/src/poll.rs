//! Generic state-machine poller for asynchronous remote operations.
//!
//! Managed-cluster operations are asynchronous on the control-plane side:
//! a mutating call returns immediately and the resource then moves through
//! pending states until it reaches a terminal one. [`StatePoller`] drives
//! that state machine: it repeatedly invokes a caller-supplied `refresh`
//! callback until the observed state lands in the terminal set, the
//! overall deadline elapses, or the caller cancels.
//!
//! The poller does not know which terminal state means success; each
//! lifecycle operation compares the final observed state against its own
//! expectation after the poll returns.
//!
//! # Example
//!
//! ```ignore
//! use armada_common::poll::{PollConfig, StatePoller};
//!
//! let poller = StatePoller::new(
//!     "create cluster",
//!     [ClusterState::Creating],
//!     [ClusterState::Running, ClusterState::Failed],
//!     PollConfig::with_timeout(Duration::from_secs(90 * 60)),
//! );
//! let observed = poller.poll(|| api.get_cluster_state(&id)).await?;
//! ```

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::{Result, DEFAULT_OPERATION_TIMEOUT, DEFAULT_POLL_DELAY, DEFAULT_POLL_INTERVAL};

/// Timing policy for a poll loop.
///
/// The interval and delay defaults are fixed policy for control-plane
/// politeness: the first refresh is never attempted before the initial
/// delay elapses, and consecutive refreshes are never closer together
/// than the minimum interval.
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Overall wall-clock deadline for reaching a terminal state
    pub timeout: Duration,
    /// Floor on the wait between consecutive refreshes
    pub min_interval: Duration,
    /// Wait before the first refresh
    pub initial_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_OPERATION_TIMEOUT,
            min_interval: DEFAULT_POLL_INTERVAL,
            initial_delay: DEFAULT_POLL_DELAY,
        }
    }
}

impl PollConfig {
    /// Create a config with the default interval and delay and the given
    /// overall timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// A single observation of a remote resource: the resource itself plus
/// the lifecycle state it was seen in.
///
/// This is both what a `refresh` callback returns and what a successful
/// poll yields. Observations are created fresh per refresh and never
/// mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observed<R, S> {
    /// The resource as returned by the control plane
    pub resource: R,
    /// The lifecycle state the resource was observed in
    pub state: S,
}

impl<R, S> Observed<R, S> {
    /// Create an observation
    pub fn new(resource: R, state: S) -> Self {
        Self { resource, state }
    }
}

/// Drives a remote resource through pending states to a terminal state.
///
/// `S` is the resource's closed state enumeration. States in `pending`
/// keep the loop going; states in `terminal` stop it. A state in neither
/// set is treated as an unexpected-but-non-fatal pending state: the loop
/// continues and the overall timeout is the safety net.
pub struct StatePoller<S> {
    operation: String,
    pending: HashSet<S>,
    terminal: HashSet<S>,
    config: PollConfig,
}

impl<S> StatePoller<S>
where
    S: Clone + Eq + Hash + Display,
{
    /// Create a poller for the given operation.
    ///
    /// `operation` names the lifecycle operation for logs and errors
    /// (e.g. "create cluster").
    pub fn new(
        operation: impl Into<String>,
        pending: impl IntoIterator<Item = S>,
        terminal: impl IntoIterator<Item = S>,
        config: PollConfig,
    ) -> Self {
        Self {
            operation: operation.into(),
            pending: pending.into_iter().collect(),
            terminal: terminal.into_iter().collect(),
            config,
        }
    }

    /// Poll until a terminal state is reached or the deadline elapses.
    ///
    /// Each invocation of `refresh` must perform a fresh remote read. A
    /// refresh error is fatal to the poll and propagated verbatim;
    /// transient-failure handling belongs to the accessor, not here.
    pub async fn poll<R, F, Fut>(&self, refresh: F) -> Result<Observed<R, S>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observed<R, S>>>,
    {
        self.poll_with_cancel(refresh, &CancellationToken::new())
            .await
    }

    /// Poll with external cancellation.
    ///
    /// Cancelling the token aborts the current wait promptly and yields
    /// [`Error::Cancelled`], distinct from a timeout.
    pub async fn poll_with_cancel<R, F, Fut>(
        &self,
        mut refresh: F,
        cancel: &CancellationToken,
    ) -> Result<Observed<R, S>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observed<R, S>>>,
    {
        let start = Instant::now();
        let deadline = start + self.config.timeout;
        let mut last_state: Option<S> = None;

        // The first refresh never precedes the initial delay.
        if self.wait(self.config.initial_delay, deadline, cancel).await? {
            return Err(self.timeout_error(start, &last_state));
        }

        loop {
            let observed = refresh().await?;

            if self.terminal.contains(&observed.state) {
                debug!(
                    operation = %self.operation,
                    state = %observed.state,
                    "reached terminal state"
                );
                return Ok(observed);
            }
            if !self.pending.contains(&observed.state) {
                debug!(
                    operation = %self.operation,
                    state = %observed.state,
                    "state outside pending set, continuing to poll"
                );
            }
            last_state = Some(observed.state.clone());

            if self.wait(self.config.min_interval, deadline, cancel).await? {
                return Err(self.timeout_error(start, &last_state));
            }
        }
    }

    /// Cancellable sleep capped at the deadline.
    ///
    /// Returns `Ok(true)` when the deadline has been reached.
    async fn wait(
        &self,
        interval: Duration,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let sleep_for = interval.min(remaining);

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(operation = %self.operation, "poll cancelled by caller");
                return Err(Error::cancelled(self.operation.as_str()));
            }
            _ = tokio::time::sleep(sleep_for) => {}
        }

        Ok(sleep_for < interval || Instant::now() >= deadline)
    }

    fn timeout_error(&self, start: Instant, last_state: &Option<S>) -> Error {
        let last = last_state
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        let elapsed = start.elapsed().as_secs();
        warn!(
            operation = %self.operation,
            last_state = %last,
            elapsed_secs = elapsed,
            "poll deadline exceeded"
        );
        Error::timeout(self.operation.as_str(), last, elapsed)
    }
}
