//! Virtual switch resource.
//!
//! A switch is created once with the attributes the caller declares; the
//! connector has no call to modify one in place. Reads fill in what the
//! switch reports, except where an undeclared attribute merely holds the
//! platform default.

use crate::error::{ProviderError, Result};
use crate::guest::derive_system_name;
use feilong_api::{CreateVSwitchParams, Gateway, VSwitchDetails};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const DEFAULT_CONTROLLER: &str = "NONE";
const DEFAULT_NETWORK_TYPE: &str = "ETHERNET";
const DEFAULT_GVRP: &str = "NOGVRP";
const DEFAULT_QUEUE_MEM: i64 = 8;
const DEFAULT_NATIVE_VLAN_ID: i64 = 1;

/// VLAN id reported for a switch that is not VLAN aware.
const VLAN_UNAWARE: &str = "UNAWARE";

/// Declared and persisted virtual switch record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VSwitchSpec {
    /// Arbitrary resource name
    pub name: String,
    /// z/VM switch name; derived from `name` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vswitch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// `CONNECT`, `DISCONNECT` or `NOUPLINK`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// `IP` or `ETHERNET`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    /// `NONROUTER` or `PRIROUTER`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    /// `ACCESS` or `TRUNK`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_type: Option<String>,
    /// `GVRP` or `NOGVRP`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gvrp: Option<String>,
    /// QDIO buffer size in megabytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_mem: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist: Option<bool>,
}

impl VSwitchSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The explicit switch name, or one derived from the resource name.
    pub fn resolved_name(&self) -> String {
        match &self.vswitch {
            Some(vswitch) if !vswitch.is_empty() => vswitch.clone(),
            _ => derive_system_name(&self.name),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ProviderError::InvalidSpec {
                field: "name",
                reason: "is required".into(),
            });
        }
        if self.resolved_name().chars().count() > 8 {
            return Err(ProviderError::InvalidSpec {
                field: "vswitch",
                reason: "must be at most 8 characters".into(),
            });
        }
        Ok(())
    }

    fn create_params(&self, name: String) -> CreateVSwitchParams {
        CreateVSwitchParams {
            name,
            real_device: self.real_device.clone(),
            controller: self.controller.clone(),
            connection: self.connection_type.clone(),
            network_type: self.network_type.clone(),
            router: self.router.clone(),
            vlan_id: self.vlan_id,
            port_type: self.port_type.clone(),
            gvrp: self.gvrp.clone(),
            queue_mem: self.queue_mem,
            native_vlan_id: self.native_vlan_id,
            persist: self.persist,
        }
    }
}

/// Create the switch with only the declared attributes.
pub async fn create_vswitch(gateway: &dyn Gateway, spec: &VSwitchSpec) -> Result<VSwitchSpec> {
    spec.validate()?;
    let name = spec.resolved_name();
    tracing::info!(vswitch = %name, "Creating virtual switch");

    gateway
        .create_vswitch(&spec.create_params(name.clone()))
        .await
        .map_err(|source| {
            tracing::error!(vswitch = %name, error = %source, "Virtual switch creation failed");
            ProviderError::Creation {
                resource: "vswitch",
                source,
            }
        })?;

    let mut state = spec.clone();
    state.vswitch = Some(name);
    Ok(state)
}

fn parse_number(field: &'static str, value: &str) -> Result<i64> {
    value.trim().parse().map_err(|_| ProviderError::FieldParse {
        field,
        value: value.to_string(),
    })
}

fn parse_vlan(field: &'static str, value: &str) -> Result<Option<i64>> {
    if value.trim().eq_ignore_ascii_case(VLAN_UNAWARE) {
        return Ok(None);
    }
    parse_number(field, value).map(Some)
}

/// Keep an undeclared attribute undeclared while the switch reports the
/// platform default for it.
fn unless_default<T: PartialEq + Display>(
    name: &str,
    field: &'static str,
    declared: &Option<T>,
    live: T,
    default: T,
) -> Option<T> {
    if declared.is_none() && live == default {
        tracing::info!(vswitch = %name, field, default = %default, "Not replacing undeclared attribute with default value");
        None
    } else {
        Some(live)
    }
}

/// Merge reported switch details into a copy of `state`.
///
/// The connection type, router and persist flag are not reported and keep
/// their persisted values.
pub fn reconcile_vswitch(state: &VSwitchSpec, details: &VSwitchDetails) -> Result<VSwitchSpec> {
    let name = state.resolved_name();
    let mut merged = state.clone();

    let mut devices = details.real_devices.iter();
    let (real_device, device) = match (devices.next(), details.real_devices.len()) {
        (Some(entry), 1) => entry,
        (_, count) => return Err(ProviderError::UnexpectedRealDevices { name, count }),
    };
    merged.real_device = Some(real_device.clone());

    merged.controller = unless_default(
        &name,
        "controller",
        &state.controller,
        device.controller.clone(),
        DEFAULT_CONTROLLER.to_string(),
    );
    merged.network_type = unless_default(
        &name,
        "network_type",
        &state.network_type,
        details.transport_type.clone(),
        DEFAULT_NETWORK_TYPE.to_string(),
    );
    merged.vlan_id = parse_vlan("vlan_id", &details.vlan_id)?;
    merged.port_type = Some(details.port_type.clone());
    merged.gvrp = unless_default(
        &name,
        "gvrp",
        &state.gvrp,
        details.gvrp_enabled_attribute.clone(),
        DEFAULT_GVRP.to_string(),
    );
    merged.queue_mem = unless_default(
        &name,
        "queue_mem",
        &state.queue_mem,
        parse_number("queue_mem", &details.queue_memory_limit)?,
        DEFAULT_QUEUE_MEM,
    );
    merged.native_vlan_id = match parse_vlan("native_vlan_id", &details.native_vlan_id)? {
        Some(live) => unless_default(
            &name,
            "native_vlan_id",
            &state.native_vlan_id,
            live,
            DEFAULT_NATIVE_VLAN_ID,
        ),
        None => None,
    };

    merged.vswitch = Some(name);
    Ok(merged)
}

/// Read the switch and merge what it reports into its state.
pub async fn read_vswitch(gateway: &dyn Gateway, state: &VSwitchSpec) -> Result<VSwitchSpec> {
    let name = state.resolved_name();
    tracing::debug!(vswitch = %name, "Reading virtual switch");
    let details = gateway.vswitch_details(&name).await.map_err(|source| {
        tracing::error!(vswitch = %name, error = %source, "Virtual switch query failed");
        ProviderError::Query {
            resource: "vswitch",
            source,
        }
    })?;
    reconcile_vswitch(state, &details)
}

fn ensure_kept<T: PartialEq + Display>(
    field: &'static str,
    prior: &Option<T>,
    declared: &Option<T>,
) -> Result<()> {
    let show = |v: &Option<T>| v.as_ref().map(ToString::to_string).unwrap_or_default();
    match declared {
        Some(value) if prior.as_ref() != Some(value) => Err(ProviderError::ImmutableValue {
            field,
            old: show(prior),
            new: show(declared),
        }),
        _ => Ok(()),
    }
}

/// Check that an update changes nothing the connector cannot change.
///
/// Attributes left undeclared keep their persisted value; declaring a
/// different value for any of them is rejected.
pub fn update_vswitch(declared: &VSwitchSpec, prior: &VSwitchSpec) -> Result<VSwitchSpec> {
    declared.validate()?;
    let name = prior.resolved_name();

    if declared.vswitch.as_deref().is_some_and(|v| !v.is_empty()) {
        ensure_kept("vswitch", &Some(name.clone()), &declared.vswitch)?;
    }
    ensure_kept("real_device", &prior.real_device, &declared.real_device)?;
    ensure_kept("controller", &prior.controller, &declared.controller)?;
    ensure_kept("connection_type", &prior.connection_type, &declared.connection_type)?;
    ensure_kept("network_type", &prior.network_type, &declared.network_type)?;
    ensure_kept("router", &prior.router, &declared.router)?;
    ensure_kept("vlan_id", &prior.vlan_id, &declared.vlan_id)?;
    ensure_kept("port_type", &prior.port_type, &declared.port_type)?;
    ensure_kept("gvrp", &prior.gvrp, &declared.gvrp)?;
    ensure_kept("queue_mem", &prior.queue_mem, &declared.queue_mem)?;
    ensure_kept("native_vlan_id", &prior.native_vlan_id, &declared.native_vlan_id)?;
    ensure_kept("persist", &prior.persist, &declared.persist)?;

    let mut next = prior.clone();
    next.name = declared.name.clone();
    next.vswitch = Some(name);
    tracing::debug!(vswitch = ?next.vswitch, "Virtual switch unchanged");
    Ok(next)
}

/// Delete the switch. Not retried.
pub async fn delete_vswitch(gateway: &dyn Gateway, state: &VSwitchSpec) -> Result<()> {
    let name = state.resolved_name();
    tracing::info!(vswitch = %name, "Deleting virtual switch");
    gateway.delete_vswitch(&name).await.map_err(|source| {
        tracing::error!(vswitch = %name, error = %source, "Virtual switch deletion failed");
        ProviderError::Deletion {
            resource: "vswitch",
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use feilong_api::VSwitchRealDevice;

    fn details() -> VSwitchDetails {
        let mut details = VSwitchDetails {
            switch_name: "PRIVNET".into(),
            port_type: "ACCESS".into(),
            transport_type: "ETHERNET".into(),
            vlan_id: "UNAWARE".into(),
            native_vlan_id: "1".into(),
            queue_memory_limit: "8".into(),
            gvrp_enabled_attribute: "NOGVRP".into(),
            ..Default::default()
        };
        details.real_devices.insert(
            "1111".into(),
            VSwitchRealDevice {
                vdev: "1111".into(),
                controller: "NONE".into(),
                ..Default::default()
            },
        );
        details
    }

    #[test]
    fn test_resolved_name() {
        assert_eq!(VSwitchSpec::new("privnet").resolved_name(), "PRIVNET");
        assert_eq!(VSwitchSpec::new("private-network").resolved_name(), "PRIVATE-");
    }

    #[test]
    fn test_create_params_only_declared() {
        let mut spec = VSwitchSpec::new("privnet");
        spec.real_device = Some("1111".into());
        let params = spec.create_params(spec.resolved_name());
        assert_eq!(params.name, "PRIVNET");
        assert_eq!(params.real_device.as_deref(), Some("1111"));
        assert!(params.controller.is_none());
        assert!(params.persist.is_none());
    }

    #[test]
    fn test_defaults_are_suppressed() {
        let state = VSwitchSpec::new("privnet");
        let merged = reconcile_vswitch(&state, &details()).unwrap();
        assert_eq!(merged.vswitch.as_deref(), Some("PRIVNET"));
        assert_eq!(merged.real_device.as_deref(), Some("1111"));
        assert_eq!(merged.port_type.as_deref(), Some("ACCESS"));
        assert_eq!(merged.controller, None);
        assert_eq!(merged.network_type, None);
        assert_eq!(merged.gvrp, None);
        assert_eq!(merged.queue_mem, None);
        assert_eq!(merged.native_vlan_id, None);
        assert_eq!(merged.vlan_id, None);
    }

    #[test]
    fn test_declared_defaults_and_non_defaults_are_kept() {
        let mut state = VSwitchSpec::new("privnet");
        state.gvrp = Some("NOGVRP".into());
        let mut live = details();
        live.queue_memory_limit = "16".into();
        live.vlan_id = "10".into();

        let merged = reconcile_vswitch(&state, &live).unwrap();
        assert_eq!(merged.gvrp.as_deref(), Some("NOGVRP"));
        assert_eq!(merged.queue_mem, Some(16));
        assert_eq!(merged.vlan_id, Some(10));
    }

    #[test]
    fn test_real_device_count() {
        let mut live = details();
        live.real_devices.clear();
        assert!(matches!(
            reconcile_vswitch(&VSwitchSpec::new("privnet"), &live),
            Err(ProviderError::UnexpectedRealDevices { count: 0, .. })
        ));
    }

    #[test]
    fn test_unparsable_numbers() {
        let mut live = details();
        live.queue_memory_limit = "lots".into();
        assert!(matches!(
            reconcile_vswitch(&VSwitchSpec::new("privnet"), &live),
            Err(ProviderError::FieldParse { field: "queue_mem", .. })
        ));
    }

    #[test]
    fn test_update_rejects_changes() {
        let mut prior = VSwitchSpec::new("privnet");
        prior.vswitch = Some("PRIVNET".into());
        prior.real_device = Some("1111".into());

        let same = VSwitchSpec::new("privnet");
        assert_eq!(update_vswitch(&same, &prior).unwrap(), prior);

        let mut changed = VSwitchSpec::new("privnet");
        changed.real_device = Some("2222".into());
        assert!(matches!(
            update_vswitch(&changed, &prior),
            Err(ProviderError::ImmutableValue { field: "real_device", .. })
        ));

        let mut changed = VSwitchSpec::new("privnet");
        changed.vlan_id = Some(10);
        assert!(matches!(
            update_vswitch(&changed, &prior),
            Err(ProviderError::ImmutableValue { field: "vlan_id", .. })
        ));
    }
}
