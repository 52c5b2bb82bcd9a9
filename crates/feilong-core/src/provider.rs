//! Connector setup and compatibility check.

use crate::error::{ProviderError, Result};
use feilong_api::{ClientConfig, Gateway, HttpGateway, VersionInfo, SUPPORTED_API_VERSION};

/// Connect to the connector and verify it speaks a supported API version.
///
/// If `config` carries an admin token, it is exchanged for the session token
/// before the version check.
///
/// # Errors
/// Returns [`ProviderError::Connect`] if the connector cannot be reached and
/// [`ProviderError::UnsupportedApiVersion`] on a version mismatch.
pub async fn connect(config: ClientConfig) -> Result<HttpGateway> {
    let gateway = HttpGateway::connect(config)
        .await
        .map_err(ProviderError::Connect)?;
    check_connector(&gateway).await?;
    Ok(gateway)
}

/// Query `GET /` and require the supported API version.
pub async fn check_connector(gateway: &dyn Gateway) -> Result<VersionInfo> {
    let version = gateway.version().await.map_err(ProviderError::Connect)?;
    if !version.is_supported() {
        tracing::error!(
            api_version = %version.api_version,
            expected = SUPPORTED_API_VERSION,
            "Unsupported connector API version"
        );
        return Err(ProviderError::UnsupportedApiVersion {
            expected: SUPPORTED_API_VERSION.into(),
            actual: version.api_version,
        });
    }
    tracing::info!(
        version = %version.version,
        api_version = %version.api_version,
        "Connected to z/VM connector"
    );
    Ok(version)
}
