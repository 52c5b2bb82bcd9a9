//! Waiting for a freshly started guest to obtain an IP address.
//!
//! The wait is a small state machine: it starts `Pending`, and each poll of
//! the first adapter either finds an address (`Ready`) or leaves it pending.
//! Reaching the deadline while pending ends in `TimedOut`. All timing goes
//! through `tokio::time`, so tests drive it with a paused clock.

use crate::config::LeaseConfig;
use crate::error::{ProviderError, Result};
use feilong_api::Gateway;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Addresses of a guest's first adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseResult {
    pub mac_address: String,
    pub ip_address: String,
    /// `4` or `6`, as reported by the adapter
    pub ip_version: String,
}

/// Progress of a lease wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseState {
    /// No address seen yet.
    Pending,
    /// The adapter reported an address.
    Ready(LeaseResult),
    /// The deadline passed while still pending.
    TimedOut,
}

impl LeaseState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Read the MAC and IP address of the guest's first adapter.
///
/// # Errors
/// Returns [`ProviderError::AddressQuery`] if the query fails or the guest
/// has no adapter.
pub async fn read_addresses(gateway: &dyn Gateway, userid: &str) -> Result<LeaseResult> {
    let adapters = gateway
        .guest_adapters(userid)
        .await
        .map_err(|e| ProviderError::AddressQuery {
            userid: userid.to_string(),
            reason: e.to_string(),
        })?;
    let first = adapters
        .adapters
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::AddressQuery {
            userid: userid.to_string(),
            reason: "guest has no network adapter".into(),
        })?;
    Ok(LeaseResult {
        mac_address: first.mac_address,
        ip_address: first.ip_address,
        ip_version: first.ip_version,
    })
}

/// Outcome of racing one poll against cancellation and the deadline.
enum Polled {
    Done(Result<LeaseState>),
    Cancelled,
    Deadline,
}

/// Polls a guest's first adapter until it reports an IP address.
pub struct LeaseWaiter<'a> {
    gateway: &'a dyn Gateway,
    userid: &'a str,
    config: LeaseConfig,
    state: LeaseState,
    polls: u32,
}

impl<'a> LeaseWaiter<'a> {
    pub fn new(gateway: &'a dyn Gateway, userid: &'a str, config: LeaseConfig) -> Self {
        Self {
            gateway,
            userid,
            config,
            state: LeaseState::Pending,
            polls: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> &LeaseState {
        &self.state
    }

    /// Number of polls made so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Poll the adapter once, moving `Pending` to `Ready` if it has an address.
    ///
    /// Terminal states are returned unchanged without a remote call.
    pub async fn poll(&mut self) -> Result<&LeaseState> {
        if self.state.is_terminal() {
            return Ok(&self.state);
        }
        let addresses = read_addresses(self.gateway, self.userid).await?;
        self.polls += 1;
        tracing::debug!(
            userid = %self.userid,
            attempt = self.polls,
            ip_address = %addresses.ip_address,
            "Polled adapter for IP address"
        );
        if !addresses.ip_address.is_empty() {
            self.state = LeaseState::Ready(addresses);
        }
        Ok(&self.state)
    }

    /// Wait for an address, honouring both the configured deadline and the
    /// caller's cancellation token.
    ///
    /// The first poll happens after `delay`, later ones every `min_interval`,
    /// and the wait gives up once `timeout` has elapsed since the start, even
    /// if a poll is still in flight.
    ///
    /// # Errors
    /// [`ProviderError::LeaseTimeout`] when the deadline passes,
    /// [`ProviderError::LeaseCancelled`] when `cancel` fires, and
    /// [`ProviderError::AddressQuery`] when a poll fails.
    pub async fn wait(mut self, cancel: &CancellationToken) -> Result<LeaseResult> {
        let start = Instant::now();
        let deadline = start + self.config.timeout;
        let mut next_poll = start + self.config.delay;
        tracing::info!(
            userid = %self.userid,
            delay_secs = self.config.delay.as_secs(),
            timeout_secs = self.config.timeout.as_secs(),
            "Waiting for IP address"
        );

        loop {
            if next_poll >= deadline {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(self.cancelled()),
                    _ = sleep_until(deadline) => {}
                }
                return Err(self.timed_out(start));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(self.cancelled()),
                _ = sleep_until(next_poll) => {}
            }

            // A hung adapter query must not outlive the deadline.
            let polled = tokio::select! {
                _ = cancel.cancelled() => Polled::Cancelled,
                _ = sleep_until(deadline) => Polled::Deadline,
                state = self.poll() => Polled::Done(state.map(LeaseState::clone)),
            };
            let state = match polled {
                Polled::Done(state) => state?,
                Polled::Cancelled => return Err(self.cancelled()),
                Polled::Deadline => return Err(self.timed_out(start)),
            };
            if let LeaseState::Ready(result) = state {
                tracing::info!(
                    userid = %self.userid,
                    ip_address = %result.ip_address,
                    polls = self.polls,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "IP address obtained"
                );
                return Ok(result);
            }
            next_poll = Instant::now() + self.config.min_interval;
        }
    }

    fn timed_out(&mut self, start: Instant) -> ProviderError {
        self.state = LeaseState::TimedOut;
        tracing::warn!(
            userid = %self.userid,
            polls = self.polls,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Timed out waiting for IP address"
        );
        ProviderError::LeaseTimeout {
            userid: self.userid.to_string(),
            timeout: self.config.timeout,
        }
    }

    fn cancelled(&self) -> ProviderError {
        tracing::warn!(userid = %self.userid, polls = self.polls, "Wait for IP address cancelled");
        ProviderError::LeaseCancelled {
            userid: self.userid.to_string(),
        }
    }
}
