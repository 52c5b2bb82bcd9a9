//! Error types for feilong-core.

use feilong_api::ApiError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for feilong-core operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors surfaced by resource operations.
///
/// Every variant names the pipeline stage or field class that failed, so a
/// caller can attribute the failure without parsing the message.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Size string is not `<digits><B|K|M|G|T>`
    #[error("cannot convert size \"{value}\": {reason}")]
    Conversion { value: String, reason: String },

    /// Declared record failed validation
    #[error("invalid {field}: {reason}")]
    InvalidSpec { field: &'static str, reason: String },

    /// `POST /guests` or `POST /vswitches` failed
    #[error("failed to create {resource}: {source}")]
    Creation {
        resource: &'static str,
        source: ApiError,
    },

    /// Network interface definition failed
    #[error("failed to configure network interface: {0}")]
    NetworkConfiguration(#[source] ApiError),

    /// Coupling the interface to the virtual switch failed
    #[error("failed to couple interface to virtual switch: {0}")]
    Coupling(#[source] ApiError),

    /// Image deployment failed
    #[error("failed to deploy image: {0}")]
    Deployment(#[source] ApiError),

    /// Starting the guest failed
    #[error("failed to start guest: {0}")]
    Startup(#[source] ApiError),

    /// No address was leased before the deadline
    #[error("no IP address obtained for {userid} within {timeout:?}")]
    LeaseTimeout { userid: String, timeout: Duration },

    /// Lease wait was cancelled by the caller
    #[error("waiting for an IP address for {userid} was cancelled")]
    LeaseCancelled { userid: String },

    /// Querying the adapter addresses failed
    #[error("failed to read addresses of {userid}: {reason}")]
    AddressQuery { userid: String, reason: String },

    /// A read query failed
    #[error("failed to query {resource}: {source}")]
    Query {
        resource: &'static str,
        source: ApiError,
    },

    /// An expected non-empty collection was empty
    #[error("{resource} not found (got {count})")]
    NotFound { resource: &'static str, count: usize },

    /// Disk geometry reported in an unsupported unit
    #[error("unknown minidisk unit: {0}")]
    UnknownUnit(String),

    /// Attempt to change an attribute that cannot change
    #[error("cannot change {field} from \"{old}\" to \"{new}\"")]
    ImmutableValue {
        field: &'static str,
        old: String,
        new: String,
    },

    /// Attempt to shrink a grow-only attribute
    #[error("cannot decrease {field} from {old} to {new}")]
    DecreaseNotAllowed {
        field: &'static str,
        old: String,
        new: String,
    },

    /// Live CPU resize failed
    #[error("failed to resize CPUs: {0}")]
    CpuResize(#[source] ApiError),

    /// Live memory resize failed
    #[error("failed to resize memory: {0}")]
    MemoryResize(#[source] ApiError),

    /// Delete request failed
    #[error("failed to delete {resource}: {source}")]
    Deletion {
        resource: &'static str,
        source: ApiError,
    },

    /// A numeric attribute reported by the connector did not parse
    #[error("cannot parse {field} value \"{value}\"")]
    FieldParse { field: &'static str, value: String },

    /// Virtual switch does not have exactly one real device
    #[error("unexpected number of real devices {count} for vswitch {name}")]
    UnexpectedRealDevices { name: String, count: usize },

    /// Connector speaks another API version
    #[error("expected Feilong API version {expected}, got: {actual}")]
    UnsupportedApiVersion { expected: String, actual: String },

    /// Connector could not be reached during configuration
    #[error("unable to contact z/VM connector: {0}")]
    Connect(#[source] ApiError),
}

impl ProviderError {
    /// Short human title for diagnostics.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Conversion { .. } => "Conversion Error",
            Self::InvalidSpec { .. } => "Invalid Configuration",
            Self::Creation { .. } => "Creation Error",
            Self::NetworkConfiguration(_) => "Network Interface Configuration Error",
            Self::Coupling(_) => "NIC Coupling Error",
            Self::Deployment(_) => "Deployment Error",
            Self::Startup(_) => "Startup Error",
            Self::LeaseTimeout { .. } | Self::LeaseCancelled { .. } => {
                "Error Waiting for an IP Address"
            }
            Self::AddressQuery { .. } => "Error Reading the IP Address",
            Self::Query { .. } => "Querying Error",
            Self::NotFound { .. } => "Not Found Error",
            Self::UnknownUnit(_) => "Unknown Minidisk Unit Error",
            Self::ImmutableValue { .. } => "Immutable Value",
            Self::DecreaseNotAllowed { .. } => "Value Can Only Increase",
            Self::CpuResize(_) => "CPUs Resizing Error",
            Self::MemoryResize(_) => "Memory Resizing Error",
            Self::Deletion { .. } => "Deletion Error",
            Self::FieldParse { .. } => "Value Conversion Error",
            Self::UnexpectedRealDevices { .. } => "VSwitch Querying Error",
            Self::UnsupportedApiVersion { .. } | Self::Connect(_) => "Client Error",
        }
    }

    /// Whether the error rejected a change before any remote call was made.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ImmutableValue { .. }
                | Self::DecreaseNotAllowed { .. }
                | Self::Conversion { .. }
                | Self::InvalidSpec { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immutable_value_message() {
        let err = ProviderError::ImmutableValue {
            field: "disk",
            old: "10G".into(),
            new: "20G".into(),
        };
        assert_eq!(err.to_string(), "cannot change disk from \"10G\" to \"20G\"");
        assert_eq!(err.summary(), "Immutable Value");
        assert!(err.is_rejection());
    }

    #[test]
    fn test_stage_summaries_are_distinct() {
        let api = || ApiError::Request("connection refused".into());
        let summaries = [
            ProviderError::Creation {
                resource: "guest",
                source: api(),
            }
            .summary(),
            ProviderError::NetworkConfiguration(api()).summary(),
            ProviderError::Coupling(api()).summary(),
            ProviderError::Deployment(api()).summary(),
            ProviderError::Startup(api()).summary(),
        ];
        for (i, a) in summaries.iter().enumerate() {
            for b in &summaries[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
