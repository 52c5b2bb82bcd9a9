//! Gateway trait: the control-plane operations the reconciler depends on.

use crate::error::Result;
use crate::guests::{
    CreateGuestParams, CreateNetworkInterfaceParams, DeployGuestParams, GuestAdapters, GuestInfo,
    GuestMinidisks, UpdateGuestNicParams,
};
use crate::version::VersionInfo;
use crate::vswitches::{CreateVSwitchParams, VSwitchDetails};
use async_trait::async_trait;

/// Typed access to the cloud connector.
///
/// This abstraction lets the reconciliation engine run against the real
/// HTTP connector or an in-memory double. Implementations must be safe to
/// share between tasks working on different guests.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `GET /` - connector and API version.
    async fn version(&self) -> Result<VersionInfo>;

    /// `POST /guests` - define a guest with its disks.
    async fn create_guest(&self, params: &CreateGuestParams) -> Result<()>;

    /// `POST /guests/{userid}/interface` - define a network interface.
    async fn create_network_interface(
        &self,
        userid: &str,
        params: &CreateNetworkInterfaceParams,
    ) -> Result<()>;

    /// `PUT /guests/{userid}/nic/{vdev}` - couple or uncouple an interface.
    async fn update_guest_nic(
        &self,
        userid: &str,
        vdev: &str,
        params: &UpdateGuestNicParams,
    ) -> Result<()>;

    /// `POST /guests/{userid}/action` with `deploy`.
    async fn deploy_guest(&self, userid: &str, params: &DeployGuestParams) -> Result<()>;

    /// `POST /guests/{userid}/action` with `start`.
    async fn start_guest(&self, userid: &str) -> Result<()>;

    /// `POST /guests/{userid}/action` with `live_resize_cpus`.
    async fn live_resize_cpus(&self, userid: &str, cpu_count: u32) -> Result<()>;

    /// `POST /guests/{userid}/action` with `live_resize_mem`.
    async fn live_resize_memory(&self, userid: &str, size: &str) -> Result<()>;

    /// `DELETE /guests/{userid}`.
    async fn delete_guest(&self, userid: &str) -> Result<()>;

    /// `GET /guests/{userid}/info`.
    async fn guest_info(&self, userid: &str) -> Result<GuestInfo>;

    /// `GET /guests/{userid}/disks`.
    async fn guest_minidisks(&self, userid: &str) -> Result<GuestMinidisks>;

    /// `GET /guests/{userid}/adapters`.
    async fn guest_adapters(&self, userid: &str) -> Result<GuestAdapters>;

    /// `POST /vswitches`.
    async fn create_vswitch(&self, params: &CreateVSwitchParams) -> Result<()>;

    /// `GET /vswitches/{name}`.
    async fn vswitch_details(&self, name: &str) -> Result<VSwitchDetails>;

    /// `DELETE /vswitches/{name}`.
    async fn delete_vswitch(&self, name: &str) -> Result<()>;
}
