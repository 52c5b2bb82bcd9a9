//! Configuration for the provider.
//!
//! Configuration is loaded from environment variables with defaults.

use feilong_api::{ClientConfig, DEFAULT_CONNECTOR, DEFAULT_TIMEOUT};
use feilong_core::{LeaseConfig, ProviderContext};
use std::time::Duration;

/// Configuration for the Feilong provider.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Connector base URL.
    pub connector: String,

    /// Admin secret exchanged for an auth token (optional).
    pub admin_token: Option<String>,

    /// `user@host` the connector fetches transport files from (optional).
    pub local_user: Option<String>,

    /// Timeout for a single connector request.
    pub request_timeout: Duration,

    /// Lease-wait timing used by guest creation.
    pub lease: LeaseConfig,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("connector", &self.connector)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("local_user", &self.local_user)
            .field("request_timeout", &self.request_timeout)
            .field("lease", &self.lease)
            .finish()
    }
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("connector URL is empty")]
    EmptyConnector,

    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            connector: DEFAULT_CONNECTOR.into(),
            admin_token: None,
            local_user: None,
            request_timeout: DEFAULT_TIMEOUT,
            lease: LeaseConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FEILONG_CONNECTOR` | `http://localhost:35000` |
    /// | `FEILONG_ADMIN_TOKEN` | none |
    /// | `FEILONG_LOCAL_USER` | none |
    /// | `FEILONG_REQUEST_TIMEOUT_SECS` | `300` |
    /// | `FEILONG_LEASE_DELAY_SECS` | `5` |
    /// | `FEILONG_LEASE_INTERVAL_SECS` | `3` |
    /// | `FEILONG_LEASE_TIMEOUT_SECS` | `60` |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, fallback: Duration| match text(key) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(key, value = %value, "Ignoring non-numeric setting");
                    fallback
                }
            },
            None => fallback,
        };

        Self {
            connector: text("FEILONG_CONNECTOR").unwrap_or(default.connector),
            admin_token: text("FEILONG_ADMIN_TOKEN"),
            local_user: text("FEILONG_LOCAL_USER"),
            request_timeout: secs("FEILONG_REQUEST_TIMEOUT_SECS", default.request_timeout),
            lease: LeaseConfig {
                delay: secs("FEILONG_LEASE_DELAY_SECS", default.lease.delay),
                min_interval: secs("FEILONG_LEASE_INTERVAL_SECS", default.lease.min_interval),
                timeout: secs("FEILONG_LEASE_TIMEOUT_SECS", default.lease.timeout),
            },
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connector.trim().is_empty() {
            return Err(ConfigError::EmptyConnector);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("FEILONG_REQUEST_TIMEOUT_SECS"));
        }
        if self.lease.min_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("FEILONG_LEASE_INTERVAL_SECS"));
        }
        if self.lease.timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("FEILONG_LEASE_TIMEOUT_SECS"));
        }
        Ok(())
    }

    /// Settings for the HTTP gateway.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connector: self.connector.clone(),
            admin_token: self.admin_token.clone(),
            timeout: self.request_timeout,
        }
    }

    /// Context handed to every resource operation.
    pub fn context(&self) -> ProviderContext {
        ProviderContext::new(self.local_user.clone()).with_lease(self.lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::from_lookup(lookup(&[]));
        assert_eq!(config.connector, "http://localhost:35000");
        assert!(config.admin_token.is_none());
        assert!(config.local_user.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert_eq!(config.lease, LeaseConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("FEILONG_CONNECTOR", "http://zvm.example.com:35000"),
            ("FEILONG_ADMIN_TOKEN", "secret"),
            ("FEILONG_LOCAL_USER", "zvmuser@10.0.0.1"),
            ("FEILONG_REQUEST_TIMEOUT_SECS", "30"),
            ("FEILONG_LEASE_DELAY_SECS", "1"),
            ("FEILONG_LEASE_INTERVAL_SECS", "2"),
            ("FEILONG_LEASE_TIMEOUT_SECS", "120"),
        ]));
        assert_eq!(config.connector, "http://zvm.example.com:35000");
        assert_eq!(config.client_config().admin_token.as_deref(), Some("secret"));
        assert_eq!(config.client_config().timeout, Duration::from_secs(30));

        let ctx = config.context();
        assert_eq!(ctx.local_user.as_deref(), Some("zvmuser@10.0.0.1"));
        assert_eq!(ctx.lease.delay, Duration::from_secs(1));
        assert_eq!(ctx.lease.min_interval, Duration::from_secs(2));
        assert_eq!(ctx.lease.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("FEILONG_REQUEST_TIMEOUT_SECS", "soon"),
            ("FEILONG_ADMIN_TOKEN", ""),
        ]));
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_validation() {
        let config = ProviderConfig::from_lookup(lookup(&[("FEILONG_LEASE_TIMEOUT_SECS", "0")]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDuration("FEILONG_LEASE_TIMEOUT_SECS"))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig::from_lookup(lookup(&[("FEILONG_ADMIN_TOKEN", "secret")]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
