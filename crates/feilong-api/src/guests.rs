//! Guest endpoints: request parameters, response payloads and body builders.
//!
//! Each request type is wrapped the way the connector expects it
//! (`{"guest": ...}`, `{"interface": ...}`, `{"info": ...}`) by the
//! corresponding `*_body` function, which the HTTP gateway sends verbatim.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One disk in a guest creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDisk {
    /// Size with unit, e.g. `10240M`
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_boot_disk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_pool: Option<String>,
}

impl GuestDisk {
    /// A boot disk of the given size, placed in the connector's default pool.
    pub fn boot(size: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            is_boot_disk: Some(true),
            format: None,
            vdev: None,
            disk_pool: None,
        }
    }
}

/// Parameters for `POST /guests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateGuestParams {
    pub userid: String,
    pub vcpus: u32,
    /// Memory in megabytes
    pub memory: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disk_list: Vec<GuestDisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mem: Option<String>,
}

/// Network settings of one guest interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuestNetwork {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(rename = "ip_addr", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "dns_addr", skip_serializing_if = "Vec::is_empty")]
    pub dns_addresses: Vec<String>,
    #[serde(rename = "gateway_addr", skip_serializing_if = "Option::is_none")]
    pub gateway_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_vdev: Option<String>,
    #[serde(rename = "mac_addr", skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osa_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl GuestNetwork {
    /// A DHCP-configured interface on the given virtual device.
    ///
    /// An empty MAC address lets the hypervisor pick one.
    pub fn dhcp(nic_vdev: impl Into<String>, mac_address: &str) -> Self {
        Self {
            method: Some("dhcp".into()),
            nic_vdev: Some(nic_vdev.into()),
            mac_address: (!mac_address.is_empty()).then(|| mac_address.to_string()),
            ..Default::default()
        }
    }
}

/// Parameters for `POST /guests/{userid}/interface`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateNetworkInterfaceParams {
    pub os_version: String,
    pub guest_networks: Vec<GuestNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Parameters for `PUT /guests/{userid}/nic/{vdev}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateGuestNicParams {
    pub couple: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vswitch: Option<String>,
}

impl UpdateGuestNicParams {
    /// Couple the interface to a virtual switch.
    pub fn couple_to(vswitch: impl Into<String>) -> Self {
        Self {
            couple: true,
            active: None,
            vswitch: Some(vswitch.into()),
        }
    }
}

/// Parameters for the `deploy` guest action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployGuestParams {
    pub image: String,
    /// Parameter files staged for the guest (cloud-init disk, network config)
    pub transport_files: Vec<String>,
    /// Host the transport files are fetched from
    pub remote_host: Option<String>,
    pub vdev: Option<String>,
    pub hostname: Option<String>,
}

/// Simple actions posted to `/guests/{userid}/action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GuestAction {
    Start,
    LiveResizeCpus { cpu_cnt: u32 },
    LiveResizeMem { size: String },
}

/// Payload of `GET /guests/{userid}/info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuestInfo {
    pub max_mem_kb: u64,
    #[serde(rename = "num_cpu")]
    pub num_cpus: u32,
    #[serde(rename = "cpu_time_us")]
    pub cpu_time_micros: u64,
    pub power_state: String,
    pub mem_kb: u64,
    pub online_cpu_num: u32,
    pub os_distro: String,
    pub kernel_info: String,
}

/// One minidisk from `GET /guests/{userid}/disks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Minidisk {
    pub vdev: String,
    pub rdev: String,
    pub access_type: String,
    pub device_type: String,
    pub device_size: u64,
    /// Unit of `device_size`, `Cylinders` on ECKD volumes
    pub device_units: String,
    pub volume_label: String,
}

/// Payload of `GET /guests/{userid}/disks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuestMinidisks {
    pub minidisks: Vec<Minidisk>,
}

/// One network adapter from `GET /guests/{userid}/adapters`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuestAdapter {
    pub lan_owner: String,
    /// Name of the virtual switch the adapter is coupled to
    pub lan_name: String,
    pub adapter_address: String,
    pub adapter_status: String,
    pub mac_address: String,
    #[serde(rename = "mac_ip_address")]
    pub ip_address: String,
    #[serde(rename = "mac_ip_version")]
    pub ip_version: String,
}

/// Payload of `GET /guests/{userid}/adapters`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuestAdapters {
    pub adapters: Vec<GuestAdapter>,
}

/// Body of `POST /guests`.
pub fn create_guest_body(params: &CreateGuestParams) -> Result<String> {
    Ok(serde_json::to_string(&serde_json::json!({ "guest": params }))?)
}

/// Body of `POST /guests/{userid}/interface`.
pub fn create_network_interface_body(params: &CreateNetworkInterfaceParams) -> Result<String> {
    Ok(serde_json::to_string(
        &serde_json::json!({ "interface": params }),
    )?)
}

/// Body of `PUT /guests/{userid}/nic/{vdev}`.
pub fn update_nic_body(params: &UpdateGuestNicParams) -> Result<String> {
    Ok(serde_json::to_string(&serde_json::json!({ "info": params }))?)
}

/// Body of a simple guest action.
pub fn action_body(action: &GuestAction) -> Result<String> {
    Ok(serde_json::to_string(action)?)
}

#[derive(Serialize)]
struct DeployBody<'a> {
    action: &'static str,
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transportfiles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remotehost: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vdev: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<&'a str>,
}

/// Body of the `deploy` guest action.
///
/// The connector takes several transport files as a repeated
/// `"transportfiles"` key, which a JSON object serializer cannot emit. The
/// body is serialized with the files comma-joined under a single key, then
/// that one occurrence is rewritten into one key per file, in order.
pub fn deploy_body(params: &DeployGuestParams) -> Result<String> {
    let joined = (!params.transport_files.is_empty()).then(|| params.transport_files.join(","));

    let body = serde_json::to_string(&DeployBody {
        action: "deploy",
        image: &params.image,
        transportfiles: joined.clone(),
        remotehost: params.remote_host.as_deref(),
        vdev: params.vdev.as_deref(),
        hostname: params.hostname.as_deref(),
    })?;

    let joined = match joined {
        Some(joined) if params.transport_files.len() > 1 => joined,
        _ => return Ok(body),
    };

    let from = format!("\"transportfiles\":{}", serde_json::to_string(&joined)?);
    let mut keys = Vec::with_capacity(params.transport_files.len());
    for file in &params.transport_files {
        keys.push(format!("\"transportfiles\":{}", serde_json::to_string(file)?));
    }
    let to = keys.join(",");

    tracing::trace!(files = params.transport_files.len(), "Repeating transportfiles key");
    Ok(body.replacen(&from, &to, 1))
}
