//! Request handler for the provider.
//!
//! Routes JSON-RPC requests to the resource operations.

use crate::protocol::{
    error_codes, CreateParams, Diagnostic, Operation, Request, Response, StateParams,
    UpdateParams,
};
use feilong_api::Gateway;
use feilong_core::{GuestSpec, GuestState, ProviderContext, VSwitchSpec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace, warn};

/// Handles requests against one shared gateway.
///
/// Requests for different resources may be handled concurrently; the host
/// is responsible for not interleaving operations on the same resource.
pub struct Handler {
    gateway: Arc<dyn Gateway>,
    ctx: ProviderContext,
    shutdown: CancellationToken,
}

impl Handler {
    pub fn new(gateway: Arc<dyn Gateway>, ctx: ProviderContext, shutdown: CancellationToken) -> Self {
        Self {
            gateway,
            ctx,
            shutdown,
        }
    }

    /// Handle a JSON-RPC request and return a response.
    ///
    /// Supported methods:
    /// - `ping` - Health check, returns `{pong: true}`.
    /// - `guest.create` / `vswitch.create` - `{declared, timeout_secs?}`
    /// - `guest.read` / `vswitch.read` - `{state}`
    /// - `guest.update` / `vswitch.update` - `{declared, prior}`
    /// - `guest.delete` / `vswitch.delete` - `{state}`
    pub async fn handle(&self, req: Request) -> Response {
        debug!(method = %req.method, id = req.id, "handling request");
        trace!(params = ?req.params, "request params");

        if req.jsonrpc != "2.0" {
            warn!(id = req.id, jsonrpc = %req.jsonrpc, "unsupported protocol version");
            return Response::error(
                req.id,
                error_codes::INVALID_REQUEST,
                format!("unsupported jsonrpc version: {}", req.jsonrpc),
            );
        }

        let id = req.id;
        let response = match req.method.as_str() {
            "ping" => Response::success(id, json!({"pong": true})),

            "guest.create" => self.guest_create(id, req.params).await,
            "guest.read" => self.guest_read(id, req.params).await,
            "guest.update" => self.guest_update(id, req.params).await,
            "guest.delete" => self.guest_delete(id, req.params).await,

            "vswitch.create" => self.vswitch_create(id, req.params).await,
            "vswitch.read" => self.vswitch_read(id, req.params).await,
            "vswitch.update" => vswitch_update(id, req.params),
            "vswitch.delete" => self.vswitch_delete(id, req.params).await,

            _ => {
                warn!(method = %req.method, "unknown method");
                Response::error(
                    id,
                    error_codes::METHOD_NOT_FOUND,
                    format!("method not found: {}", req.method),
                )
            }
        };

        if response.error.is_some() {
            debug!(id, error = ?response.error, "request failed");
        } else {
            debug!(id, "request succeeded");
            trace!(result = ?response.result, "response result");
        }

        response
    }

    /// Token for one request: cancelled on shutdown or once its deadline
    /// passes. The guard stops the deadline timer when the request ends.
    fn request_token(&self, timeout_secs: Option<u64>) -> (CancellationToken, DropGuard) {
        let token = self.shutdown.child_token();
        if let Some(secs) = timeout_secs {
            let deadline = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                        debug!(timeout_secs = secs, "request deadline reached");
                        deadline.cancel();
                    }
                    _ = deadline.cancelled() => {}
                }
            });
        }
        let guard = token.clone().drop_guard();
        (token, guard)
    }

    async fn guest_create(&self, id: u64, params: Value) -> Response {
        let p: CreateParams<GuestSpec> = match parse(id, params) {
            Ok(p) => p,
            Err(response) => return response,
        };
        let (cancel, _guard) = self.request_token(p.timeout_secs);
        let result =
            feilong_core::create_guest(self.gateway.as_ref(), &self.ctx, &p.declared, &cancel)
                .await;
        finish(id, Operation::Create, "guest", result)
    }

    async fn guest_read(&self, id: u64, params: Value) -> Response {
        let p: StateParams<GuestState> = match parse(id, params) {
            Ok(p) => p,
            Err(response) => return response,
        };
        let result = feilong_core::read_guest(self.gateway.as_ref(), &p.state).await;
        finish(id, Operation::Read, "guest", result)
    }

    async fn guest_update(&self, id: u64, params: Value) -> Response {
        let p: UpdateParams<GuestSpec, GuestState> = match parse(id, params) {
            Ok(p) => p,
            Err(response) => return response,
        };
        let result = feilong_core::update_guest(self.gateway.as_ref(), &p.declared, &p.prior).await;
        finish(id, Operation::Update, "guest", result)
    }

    async fn guest_delete(&self, id: u64, params: Value) -> Response {
        let p: StateParams<GuestState> = match parse(id, params) {
            Ok(p) => p,
            Err(response) => return response,
        };
        let result = feilong_core::delete_guest(self.gateway.as_ref(), &p.state)
            .await
            .map(|()| json!({"deleted": true}));
        finish(id, Operation::Delete, "guest", result)
    }

    async fn vswitch_create(&self, id: u64, params: Value) -> Response {
        let p: CreateParams<VSwitchSpec> = match parse(id, params) {
            Ok(p) => p,
            Err(response) => return response,
        };
        let result = feilong_core::create_vswitch(self.gateway.as_ref(), &p.declared).await;
        finish(id, Operation::Create, "vswitch", result)
    }

    async fn vswitch_read(&self, id: u64, params: Value) -> Response {
        let p: StateParams<VSwitchSpec> = match parse(id, params) {
            Ok(p) => p,
            Err(response) => return response,
        };
        let result = feilong_core::read_vswitch(self.gateway.as_ref(), &p.state).await;
        finish(id, Operation::Read, "vswitch", result)
    }

    async fn vswitch_delete(&self, id: u64, params: Value) -> Response {
        let p: StateParams<VSwitchSpec> = match parse(id, params) {
            Ok(p) => p,
            Err(response) => return response,
        };
        let result = feilong_core::delete_vswitch(self.gateway.as_ref(), &p.state)
            .await
            .map(|()| json!({"deleted": true}));
        finish(id, Operation::Delete, "vswitch", result)
    }
}

fn vswitch_update(id: u64, params: Value) -> Response {
    let p: UpdateParams<VSwitchSpec, VSwitchSpec> = match parse(id, params) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let result = feilong_core::update_vswitch(&p.declared, &p.prior);
    finish(id, Operation::Update, "vswitch", result)
}

/// Deserialize method parameters or build the `INVALID_PARAMS` response.
fn parse<T: DeserializeOwned>(id: u64, params: Value) -> Result<T, Response> {
    serde_json::from_value(params).map_err(|e| {
        warn!(id, error = %e, "invalid params");
        Response::error(
            id,
            error_codes::INVALID_PARAMS,
            format!("invalid params: {}", e),
        )
    })
}

/// Turn an operation result into a response.
fn finish<T: Serialize>(
    id: u64,
    operation: Operation,
    resource: &str,
    result: feilong_core::Result<T>,
) -> Response {
    match result {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(v) => Response::success(id, v),
            Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
        },
        Err(e) => {
            warn!(id, ?operation, resource, error = %e, "operation failed");
            Response::failed(id, Diagnostic::new(operation, resource, &e))
        }
    }
}
