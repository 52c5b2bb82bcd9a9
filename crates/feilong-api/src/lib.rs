//! Typed client for the Feilong z/VM cloud connector.
//!
//! The connector exposes guests and virtual switches over a small JSON REST
//! API. This crate provides:
//! - Request and response types for the endpoints the provider uses
//! - The [`Gateway`] trait the reconciliation engine is written against
//! - [`HttpGateway`], the hyper-based implementation of that trait

pub mod client;
pub mod error;
pub mod gateway;
pub mod guests;
pub mod response;
pub mod version;
pub mod vswitches;

pub use client::{ClientConfig, HttpGateway, DEFAULT_CONNECTOR, DEFAULT_TIMEOUT};
pub use error::{ApiError, Result};
pub use gateway::Gateway;
pub use guests::{
    CreateGuestParams, CreateNetworkInterfaceParams, DeployGuestParams, GuestAction, GuestAdapter,
    GuestAdapters, GuestDisk, GuestInfo, GuestMinidisks, GuestNetwork, Minidisk,
    UpdateGuestNicParams,
};
pub use response::ApiResponse;
pub use version::{VersionInfo, SUPPORTED_API_VERSION};
pub use vswitches::{CreateVSwitchParams, VSwitchDetails, VSwitchRealDevice};
