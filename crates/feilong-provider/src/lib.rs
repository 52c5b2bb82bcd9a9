//! Host boundary for Feilong guest and virtual switch resources.
//!
//! The host drives resource operations over newline-delimited JSON-RPC 2.0
//! on stdin/stdout. Logs go to stderr.

pub mod config;
pub mod handler;
pub mod protocol;
pub mod server;

pub use config::{ConfigError, ProviderConfig};
pub use handler::Handler;
pub use protocol::{error_codes, Diagnostic, Operation, Request, Response, RpcError};
pub use server::serve;
