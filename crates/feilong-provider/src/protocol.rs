//! JSON-RPC 2.0 protocol types for the provider.
//!
//! One request per stdin line, one response per stdout line.

use feilong_core::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 error codes.
pub mod error_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// A resource operation failed; `data` carries the diagnostic.
    pub const OPERATION_FAILED: i32 = -32000;
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct Request {
    /// Protocol version, must be "2.0".
    pub jsonrpc: String,
    /// Request identifier.
    pub id: u64,
    /// Method name to invoke.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version, always "2.0".
    pub jsonrpc: String,
    /// Request identifier (matches request), `null` when the request
    /// could not be parsed.
    pub id: Option<u64>,
    /// Result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Create a success response.
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: u64, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Create the response to a line that is not a valid request.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            result: None,
            error: Some(RpcError {
                code: error_codes::PARSE_ERROR,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Create a response for a failed resource operation.
    pub fn failed(id: u64, diagnostic: Diagnostic) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: None,
            error: Some(RpcError {
                code: error_codes::OPERATION_FAILED,
                message: diagnostic.summary.clone(),
                data: serde_json::to_value(&diagnostic).ok(),
            }),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Additional error data (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Operation a request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

/// Human-readable failure report attributed to an operation and resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub operation: Operation,
    /// `guest` or `vswitch`
    pub resource: String,
    /// Short title naming the failed stage or field class
    pub summary: String,
    /// Full error message
    pub detail: String,
}

impl Diagnostic {
    pub fn new(operation: Operation, resource: &str, error: &ProviderError) -> Self {
        Self {
            operation,
            resource: resource.to_string(),
            summary: error.summary().to_string(),
            detail: format!("Got error: {error}"),
        }
    }
}

/// Parameters for `*.create`.
#[derive(Debug, Deserialize)]
pub struct CreateParams<T> {
    pub declared: T,
    /// Caller deadline, after which a pending lease wait is abandoned
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `*.read` and `*.delete`.
#[derive(Debug, Deserialize)]
pub struct StateParams<T> {
    pub state: T,
}

/// Parameters for `*.update`.
#[derive(Debug, Deserialize)]
pub struct UpdateParams<D, S> {
    pub declared: D,
    pub prior: S,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let response = Response::error(7, error_codes::METHOD_NOT_FOUND, "method not found: x");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["error"]["code"], -32601);
        assert!(json.get("result").is_none());
        assert!(json["error"].get("data").is_none());
    }

    #[test]
    fn test_failed_response_carries_diagnostic() {
        let error = ProviderError::ImmutableValue {
            field: "image",
            old: "sles15".into(),
            new: "rhel9".into(),
        };
        let response = Response::failed(3, Diagnostic::new(Operation::Update, "guest", &error));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], -32000);
        assert_eq!(json["error"]["message"], "Immutable Value");
        assert_eq!(json["error"]["data"]["operation"], "update");
        assert_eq!(json["error"]["data"]["resource"], "guest");
        assert_eq!(
            json["error"]["data"]["detail"],
            "Got error: cannot change image from \"sles15\" to \"rhel9\""
        );
    }

    #[test]
    fn test_parse_error_has_null_id() {
        let response = Response::parse_error("parse error: expected value");
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["id"].is_null());
        assert!(json.as_object().unwrap().contains_key("id"));
        assert_eq!(json["error"]["code"], -32700);
    }

    #[test]
    fn test_request_params_default() {
        let req: Request = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert_eq!(req.method, "ping");
        assert!(req.params.is_null());
    }
}
