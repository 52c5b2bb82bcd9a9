//! HTTP gateway to the cloud connector.
//!
//! Requests are plain HTTP/1 JSON exchanges built with hyper. The optional
//! auth token is obtained once in [`HttpGateway::connect`] and never changes
//! afterwards, so one gateway can be shared by concurrent operations.

use crate::error::{ApiError, Result};
use crate::gateway::Gateway;
use crate::guests::{
    action_body, create_guest_body, create_network_interface_body, deploy_body, update_nic_body,
    CreateGuestParams, CreateNetworkInterfaceParams, DeployGuestParams, GuestAction, GuestAdapters,
    GuestInfo, GuestMinidisks, UpdateGuestNicParams,
};
use crate::response::ApiResponse;
use crate::version::VersionInfo;
use crate::vswitches::{create_vswitch_body, CreateVSwitchParams, VSwitchDetails};
use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request, Uri};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Connector address used when none is configured.
pub const DEFAULT_CONNECTOR: &str = "http://localhost:35000";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Connection settings for [`HttpGateway`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connector base URL, e.g. `http://zvm.example.com:35000`
    pub connector: String,
    /// Shared admin secret exchanged for an auth token (optional)
    pub admin_token: Option<String>,
    /// Timeout for a single request, including reading the body
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connector: DEFAULT_CONNECTOR.into(),
            admin_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Settings for the given connector with default timeout and no token.
    pub fn new(connector: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            ..Default::default()
        }
    }

    /// Exchange this admin secret for an auth token on connect.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`Gateway`] implementation speaking HTTP to a real connector.
pub struct HttpGateway {
    client: Client<HttpConnector>,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl HttpGateway {
    /// Build a gateway and, if an admin token is configured, obtain the auth
    /// token used for every later request.
    ///
    /// # Errors
    /// Returns an error if the connector URL is invalid or the token
    /// exchange fails.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let base_url = normalize_connector(&config.connector)?;
        tracing::debug!(connector = %base_url, timeout_secs = config.timeout.as_secs(), "Creating connector gateway");

        let mut gateway = Self {
            client: Client::new(),
            base_url,
            auth_token: None,
            timeout: config.timeout,
        };

        if let Some(admin_token) = &config.admin_token {
            let token = gateway.create_token(admin_token).await?;
            gateway.auth_token = Some(token);
            tracing::info!(connector = %gateway.base_url, "Obtained connector auth token");
        }

        Ok(gateway)
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Auth token attached to requests, if one was obtained.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// `POST /token`: trade the admin secret for an auth token.
    async fn create_token(&self, admin_token: &str) -> Result<String> {
        let (headers, _) = self
            .exchange(Method::POST, "/token", None, Some((ADMIN_TOKEN_HEADER, admin_token)))
            .await?;

        headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::Token(format!("response carried no {AUTH_TOKEN_HEADER} header")))
    }

    /// Send one request and return the response headers and body.
    ///
    /// Any status other than 200 is an error carrying the response body.
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        token: Option<(&str, &str)>,
    ) -> Result<(hyper::HeaderMap, Bytes)> {
        let start = std::time::Instant::now();
        let url = format!("{}{}", self.base_url, path);
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| ApiError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!(method = %method, path = %path, "Sending connector request");
        if let Some(body) = &body {
            tracing::trace!(body = %body, "Connector request body");
        }

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some((name, value)) = token.or_else(|| {
            self.auth_token
                .as_deref()
                .map(|t| (AUTH_TOKEN_HEADER, t))
        }) {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .map_err(|e| ApiError::Request(format!("failed to build request: {e}")))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ApiError::Request(e.to_string()))?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|e| ApiError::Request(format!("failed to read response body: {e}")))?;
            Ok::<_, ApiError>((status, headers, bytes))
        };

        let (status, headers, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                tracing::warn!(method = %method, path = %path, timeout_secs = self.timeout.as_secs(), "Connector request timeout");
                ApiError::Timeout(self.timeout)
            })??;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if status != hyper::StatusCode::OK {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::warn!(method = %method, path = %path, status = %status, elapsed_ms, "Connector request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(method = %method, path = %path, elapsed_ms, "Connector request succeeded");
        tracing::trace!(body = %String::from_utf8_lossy(&bytes), "Connector response body");
        Ok((headers, bytes))
    }

    /// Send a request whose answer is not needed beyond its status.
    async fn send(&self, method: Method, path: &str, body: Option<String>) -> Result<()> {
        self.exchange(method, path, body, None).await?;
        Ok(())
    }

    /// `GET` a path and unwrap the `output` of the response envelope.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (_, bytes) = self.exchange(Method::GET, path, None, None).await?;
        let response: ApiResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(response.output)
    }

    async fn action(&self, userid: &str, action: &GuestAction) -> Result<()> {
        self.send(
            Method::POST,
            &format!("/guests/{userid}/action"),
            Some(action_body(action)?),
        )
        .await
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn version(&self) -> Result<VersionInfo> {
        self.get("/").await
    }

    async fn create_guest(&self, params: &CreateGuestParams) -> Result<()> {
        self.send(Method::POST, "/guests", Some(create_guest_body(params)?))
            .await
    }

    async fn create_network_interface(
        &self,
        userid: &str,
        params: &CreateNetworkInterfaceParams,
    ) -> Result<()> {
        self.send(
            Method::POST,
            &format!("/guests/{userid}/interface"),
            Some(create_network_interface_body(params)?),
        )
        .await
    }

    async fn update_guest_nic(
        &self,
        userid: &str,
        vdev: &str,
        params: &UpdateGuestNicParams,
    ) -> Result<()> {
        self.send(
            Method::PUT,
            &format!("/guests/{userid}/nic/{vdev}"),
            Some(update_nic_body(params)?),
        )
        .await
    }

    async fn deploy_guest(&self, userid: &str, params: &DeployGuestParams) -> Result<()> {
        self.send(
            Method::POST,
            &format!("/guests/{userid}/action"),
            Some(deploy_body(params)?),
        )
        .await
    }

    async fn start_guest(&self, userid: &str) -> Result<()> {
        self.action(userid, &GuestAction::Start).await
    }

    async fn live_resize_cpus(&self, userid: &str, cpu_count: u32) -> Result<()> {
        self.action(userid, &GuestAction::LiveResizeCpus { cpu_cnt: cpu_count })
            .await
    }

    async fn live_resize_memory(&self, userid: &str, size: &str) -> Result<()> {
        self.action(
            userid,
            &GuestAction::LiveResizeMem {
                size: size.to_string(),
            },
        )
        .await
    }

    async fn delete_guest(&self, userid: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("/guests/{userid}"), None)
            .await
    }

    async fn guest_info(&self, userid: &str) -> Result<GuestInfo> {
        self.get(&format!("/guests/{userid}/info")).await
    }

    async fn guest_minidisks(&self, userid: &str) -> Result<GuestMinidisks> {
        self.get(&format!("/guests/{userid}/disks")).await
    }

    async fn guest_adapters(&self, userid: &str) -> Result<GuestAdapters> {
        self.get(&format!("/guests/{userid}/adapters")).await
    }

    async fn create_vswitch(&self, params: &CreateVSwitchParams) -> Result<()> {
        self.send(Method::POST, "/vswitches", Some(create_vswitch_body(params)?))
            .await
    }

    async fn vswitch_details(&self, name: &str) -> Result<VSwitchDetails> {
        self.get(&format!("/vswitches/{name}")).await
    }

    async fn delete_vswitch(&self, name: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("/vswitches/{name}"), None)
            .await
    }
}

/// Turn a configured connector into a base URL without trailing slash.
///
/// A bare `host:port` is taken as plain HTTP, like the connector's own
/// clients do.
fn normalize_connector(connector: &str) -> Result<String> {
    let trimmed = connector.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::InvalidUrl {
            url: connector.to_string(),
            reason: "connector is empty".into(),
        });
    }
    if trimmed.starts_with("https://") {
        return Err(ApiError::InvalidUrl {
            url: connector.to_string(),
            reason: "only plain http connectors are supported".into(),
        });
    }
    let url = if trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    url.parse::<Uri>().map_err(|e| ApiError::InvalidUrl {
        url: connector.to_string(),
        reason: e.to_string(),
    })?;
    Ok(url)
}
