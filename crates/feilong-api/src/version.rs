//! Connector version endpoint.

use serde::Deserialize;

/// API version this client speaks.
pub const SUPPORTED_API_VERSION: &str = "1.0";

/// Payload of `GET /`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub version: String,
    pub api_version: String,
    pub max_version: String,
    pub min_version: String,
}

impl VersionInfo {
    /// Whether the connector exposes the API version this client speaks.
    pub fn is_supported(&self) -> bool {
        self.api_version == SUPPORTED_API_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_version() {
        let info: VersionInfo = serde_json::from_str(
            r#"{"version":"1.6.6","api_version":"1.0","max_version":"1.0","min_version":"1.0"}"#,
        )
        .unwrap();
        assert!(info.is_supported());

        let newer = VersionInfo {
            api_version: "2.0".into(),
            ..Default::default()
        };
        assert!(!newer.is_supported());
    }
}
