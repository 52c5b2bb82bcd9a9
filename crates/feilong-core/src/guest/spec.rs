//! Declared and persisted guest records.

use crate::error::{ProviderError, Result};
use crate::units::to_megabytes;
use serde::{Deserialize, Serialize};

/// Longest z/VM user ID (and virtual switch name).
pub const MAX_SYSTEM_NAME_LEN: usize = 8;

pub const DEFAULT_VCPUS: u32 = 1;
pub const DEFAULT_MEMORY: &str = "512M";
pub const DEFAULT_DISK: &str = "10G";
pub const DEFAULT_ADAPTER_ADDRESS: &str = "1000";
pub const DEFAULT_VSWITCH: &str = "DEVNET";

fn default_vcpus() -> u32 {
    DEFAULT_VCPUS
}

fn default_memory() -> String {
    DEFAULT_MEMORY.into()
}

fn default_disk() -> String {
    DEFAULT_DISK.into()
}

fn default_adapter_address() -> String {
    DEFAULT_ADAPTER_ADDRESS.into()
}

fn default_vswitch() -> String {
    DEFAULT_VSWITCH.into()
}

/// Derive a z/VM system name from a resource name: uppercase, at most
/// eight characters.
pub fn derive_system_name(name: &str) -> String {
    name.to_uppercase().chars().take(MAX_SYSTEM_NAME_LEN).collect()
}

/// Desired configuration of a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSpec {
    /// Arbitrary resource name
    pub name: String,
    /// z/VM user ID; derived from `name` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
    #[serde(default = "default_vcpus")]
    pub vcpus: u32,
    /// Memory size with unit, e.g. `"2G"`
    #[serde(default = "default_memory")]
    pub memory: String,
    /// Size of the boot disk with unit
    #[serde(default = "default_disk")]
    pub disk: String,
    /// Image to deploy
    pub image: String,
    /// Operating system version, e.g. `sles15.7`
    pub os_version: String,
    /// Virtual device of the first network interface
    #[serde(default = "default_adapter_address")]
    pub adapter_address: String,
    /// Desired MAC address of the first interface
    #[serde(default)]
    pub mac: String,
    /// Virtual switch the first interface is coupled to
    #[serde(default = "default_vswitch")]
    pub vswitch: String,
    /// Path to a cloud-init parameters file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinit_params: Option<String>,
    /// Path to a network parameters file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_params: Option<String>,
}

impl GuestSpec {
    /// Minimal spec with every optional attribute at its default.
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        os_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            userid: None,
            vcpus: DEFAULT_VCPUS,
            memory: default_memory(),
            disk: default_disk(),
            image: image.into(),
            os_version: os_version.into(),
            adapter_address: default_adapter_address(),
            mac: String::new(),
            vswitch: default_vswitch(),
            cloudinit_params: None,
            network_params: None,
        }
    }

    /// The explicit user ID, or one derived from the name.
    pub fn resolved_userid(&self) -> String {
        match &self.userid {
            Some(userid) if !userid.is_empty() => userid.clone(),
            _ => derive_system_name(&self.name),
        }
    }

    /// Auxiliary files staged on deploy, cloud-init first.
    pub fn transport_files(&self) -> Vec<String> {
        transport_files(&self.cloudinit_params, &self.network_params)
    }

    /// Validate the declared record once, before any remote call.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| ProviderError::InvalidSpec {
            field,
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name", "is required"));
        }
        if let Some(userid) = self.userid.as_deref().filter(|u| !u.is_empty()) {
            if userid.chars().count() > MAX_SYSTEM_NAME_LEN {
                return Err(invalid("userid", "must be at most 8 characters"));
            }
            if userid.to_uppercase() != userid {
                return Err(invalid("userid", "must be uppercase"));
            }
        }
        if self.vcpus == 0 {
            return Err(invalid("vcpus", "must be > 0"));
        }
        if self.image.is_empty() {
            return Err(invalid("image", "is required"));
        }
        if self.os_version.is_empty() {
            return Err(invalid("os_version", "is required"));
        }
        if self.adapter_address.is_empty() {
            return Err(invalid("adapter_address", "must not be empty"));
        }
        if self.vswitch.is_empty() {
            return Err(invalid("vswitch", "must not be empty"));
        }
        to_megabytes(&self.memory)?;
        to_megabytes(&self.disk)?;
        Ok(())
    }
}

fn transport_files(cloudinit: &Option<String>, network: &Option<String>) -> Vec<String> {
    [cloudinit, network]
        .into_iter()
        .flatten()
        .filter(|path| !path.is_empty())
        .cloned()
        .collect()
}

/// Persisted guest record: the declared attributes with the user ID
/// resolved, plus the addresses observed after deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestState {
    pub name: String,
    pub userid: String,
    pub vcpus: u32,
    pub memory: String,
    pub disk: String,
    pub image: String,
    pub os_version: String,
    pub adapter_address: String,
    #[serde(default)]
    pub mac: String,
    pub vswitch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinit_params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_params: Option<String>,
    /// MAC address of the first interface after deployment
    #[serde(default)]
    pub mac_address: String,
    /// IP address of the first interface after deployment
    #[serde(default)]
    pub ip_address: String,
}

impl GuestState {
    /// State for a declared spec under the given user ID, addresses unknown.
    pub fn from_spec(spec: &GuestSpec, userid: impl Into<String>) -> Self {
        Self {
            name: spec.name.clone(),
            userid: userid.into(),
            vcpus: spec.vcpus,
            memory: spec.memory.clone(),
            disk: spec.disk.clone(),
            image: spec.image.clone(),
            os_version: spec.os_version.clone(),
            adapter_address: spec.adapter_address.clone(),
            mac: spec.mac.clone(),
            vswitch: spec.vswitch.clone(),
            cloudinit_params: spec.cloudinit_params.clone(),
            network_params: spec.network_params.clone(),
            mac_address: String::new(),
            ip_address: String::new(),
        }
    }

    /// Auxiliary files staged on deploy, cloud-init first.
    pub fn transport_files(&self) -> Vec<String> {
        transport_files(&self.cloudinit_params, &self.network_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_system_name() {
        assert_eq!(derive_system_name("testacc"), "TESTACC");
        assert_eq!(derive_system_name("webserver01"), "WEBSERVE");
        assert_eq!(derive_system_name(""), "");
    }

    #[test]
    fn test_resolved_userid() {
        let mut spec = GuestSpec::new("webserver01", "rhel8", "rhel8.8");
        assert_eq!(spec.resolved_userid(), "WEBSERVE");
        spec.userid = Some("WEB1".into());
        assert_eq!(spec.resolved_userid(), "WEB1");
        spec.userid = Some(String::new());
        assert_eq!(spec.resolved_userid(), "WEBSERVE");
    }

    #[test]
    fn test_defaults_from_json() {
        let spec: GuestSpec = serde_json::from_str(
            r#"{"name":"testacc","image":"sles15","os_version":"sles15.7"}"#,
        )
        .unwrap();
        assert_eq!(spec, GuestSpec::new("testacc", "sles15", "sles15.7"));
        assert_eq!(spec.vcpus, 1);
        assert_eq!(spec.memory, "512M");
        assert_eq!(spec.disk, "10G");
        assert_eq!(spec.adapter_address, "1000");
        assert_eq!(spec.vswitch, "DEVNET");
        assert!(spec.transport_files().is_empty());
    }

    #[test]
    fn test_validate() {
        let spec = GuestSpec::new("testacc", "sles15", "sles15.7");
        assert!(spec.validate().is_ok());

        let mut bad = spec.clone();
        bad.memory = "512X".into();
        assert!(matches!(
            bad.validate(),
            Err(ProviderError::Conversion { .. })
        ));

        let mut bad = spec.clone();
        bad.userid = Some("TOOLONGID".into());
        assert!(matches!(
            bad.validate(),
            Err(ProviderError::InvalidSpec { field: "userid", .. })
        ));

        let mut bad = spec.clone();
        bad.userid = Some("lower".into());
        assert!(bad.validate().is_err());

        let mut bad = spec;
        bad.vcpus = 0;
        assert!(matches!(
            bad.validate(),
            Err(ProviderError::InvalidSpec { field: "vcpus", .. })
        ));
    }

    #[test]
    fn test_transport_files_order() {
        let mut spec = GuestSpec::new("testacc", "sles15", "sles15.7");
        spec.network_params = Some("/tmp/network.tgz".into());
        spec.cloudinit_params = Some("/tmp/cloudinit.iso".into());
        assert_eq!(
            spec.transport_files(),
            vec!["/tmp/cloudinit.iso", "/tmp/network.tgz"]
        );
    }

    #[test]
    fn test_state_from_spec() {
        let spec = GuestSpec::new("testacc", "sles15", "sles15.7");
        let state = GuestState::from_spec(&spec, "TESTACC");
        assert_eq!(state.userid, "TESTACC");
        assert_eq!(state.memory, spec.memory);
        assert!(state.ip_address.is_empty());
    }
}
