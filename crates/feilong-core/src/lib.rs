//! Reconciliation engine for Feilong guests and virtual switches.
//!
//! Each resource operation takes the [`Gateway`](feilong_api::Gateway) it
//! talks through and the [`ProviderContext`] explicitly, so independent
//! resources can be handled concurrently over one shared gateway.
//!
//! # Example
//!
//! ```rust,no_run
//! use feilong_api::ClientConfig;
//! use feilong_core::{create_guest, GuestSpec, ProviderContext};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), feilong_core::ProviderError> {
//!     let gateway = feilong_core::connect(ClientConfig::default()).await?;
//!     let ctx = ProviderContext::default();
//!     let spec = GuestSpec::new("testacc", "sles15", "sles15.7");
//!
//!     let state = create_guest(&gateway, &ctx, &spec, &CancellationToken::new()).await?;
//!     println!("{} got {}", state.userid, state.ip_address);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod guest;
pub mod net;
pub mod provider;
pub mod units;
pub mod vswitch;

pub use config::{LeaseConfig, ProviderContext};
pub use error::{ProviderError, Result};
pub use guest::{
    create_guest, delete_guest, plan_update, read_guest, update_guest, GuestObservedState,
    GuestSpec, GuestState, LeaseResult, LeaseState, LeaseWaiter, UpdatePlan,
};
pub use provider::{check_connector, connect};
pub use vswitch::{create_vswitch, delete_vswitch, read_vswitch, update_vswitch, VSwitchSpec};
