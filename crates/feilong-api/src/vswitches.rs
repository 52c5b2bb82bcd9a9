//! Virtual switch endpoints.

use crate::error::Result;
use crate::response::lenient_string;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters for `POST /vswitches`.
///
/// Attributes left as `None` are omitted so the hypervisor applies its own
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateVSwitchParams {
    pub name: String,
    #[serde(rename = "rdev", skip_serializing_if = "Option::is_none")]
    pub real_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    #[serde(rename = "vid", skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gvrp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_mem: Option<i64>,
    #[serde(rename = "native_vid", skip_serializing_if = "Option::is_none")]
    pub native_vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist: Option<bool>,
}

/// A real (OSA) device backing a virtual switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VSwitchRealDevice {
    pub vdev: String,
    pub controller: String,
    pub port_name: String,
    pub dev_status: String,
    pub dev_err: String,
}

/// Payload of `GET /vswitches/{name}`.
///
/// Numeric attributes are reported as strings by the connector (`"0001"`,
/// `"UNAWARE"`) and kept that way here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VSwitchDetails {
    pub switch_name: String,
    pub switch_type: String,
    pub switch_status: String,
    pub port_type: String,
    pub transport_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vlan_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub native_vlan_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub queue_memory_limit: String,
    pub gvrp_enabled_attribute: String,
    pub real_devices: BTreeMap<String, VSwitchRealDevice>,
}

/// Body of `POST /vswitches`.
pub fn create_vswitch_body(params: &CreateVSwitchParams) -> Result<String> {
    Ok(serde_json::to_string(
        &serde_json::json!({ "vswitch": params }),
    )?)
}
