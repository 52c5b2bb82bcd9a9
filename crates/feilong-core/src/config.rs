//! Provider-wide settings passed to every resource operation.

use crate::error::{ProviderError, Result};
use std::time::Duration;

/// Default wait before the first lease poll.
pub const DEFAULT_LEASE_DELAY: Duration = Duration::from_secs(5);

/// Default interval between lease polls.
pub const DEFAULT_LEASE_INTERVAL: Duration = Duration::from_secs(3);

/// Default upper bound on the whole lease wait.
pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(60);

/// Polling parameters for waiting on a guest's IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseConfig {
    /// Wait before the first poll.
    pub delay: Duration,
    /// Minimum time between polls.
    pub min_interval: Duration,
    /// Hard deadline measured from the start of the wait.
    pub timeout: Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_LEASE_DELAY,
            min_interval: DEFAULT_LEASE_INTERVAL,
            timeout: DEFAULT_LEASE_TIMEOUT,
        }
    }
}

impl LeaseConfig {
    /// Validate the polling parameters.
    pub fn validate(&self) -> Result<()> {
        if self.min_interval.is_zero() {
            return Err(ProviderError::InvalidSpec {
                field: "lease interval",
                reason: "must be > 0".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ProviderError::InvalidSpec {
                field: "lease timeout",
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

/// Values every resource operation needs besides the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderContext {
    /// `user@host` the connector copies transport files from, sent as
    /// `remotehost` on deploy.
    pub local_user: Option<String>,
    /// Lease-wait parameters used by Create.
    pub lease: LeaseConfig,
}

impl ProviderContext {
    /// Context with the given local user and default lease settings.
    pub fn new(local_user: Option<String>) -> Self {
        Self {
            local_user: local_user.filter(|u| !u.is_empty()),
            lease: LeaseConfig::default(),
        }
    }

    /// Replace the lease settings.
    pub fn with_lease(mut self, lease: LeaseConfig) -> Self {
        self.lease = lease;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_defaults() {
        let lease = LeaseConfig::default();
        assert_eq!(lease.delay, Duration::from_secs(5));
        assert_eq!(lease.min_interval, Duration::from_secs(3));
        assert_eq!(lease.timeout, Duration::from_secs(60));
        assert!(lease.validate().is_ok());
    }

    #[test]
    fn test_lease_validation() {
        let lease = LeaseConfig {
            min_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(lease.validate().is_err());
    }

    #[test]
    fn test_context_drops_empty_local_user() {
        assert_eq!(ProviderContext::new(Some(String::new())).local_user, None);
        assert_eq!(
            ProviderContext::new(Some("me@host".into())).local_user.as_deref(),
            Some("me@host")
        );
    }
}
