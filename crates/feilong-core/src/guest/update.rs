//! Planning and applying guest updates.
//!
//! Every attribute falls into one of three classes:
//!
//! | Attribute | Policy |
//! |---|---|
//! | `userid`, `image`, `os_version`, `adapter_address`, `vswitch`, transport files | immutable |
//! | `disk` | immutable, compared in megabytes |
//! | `mac` | immutable except for the host-assigned first three bytes |
//! | `vcpus`, `memory` | grow-only, applied by live resize |
//! | `name` | free |
//!
//! The whole plan is validated before the first remote call, so a rejected
//! update never leaves a partial change behind.

use super::lease::read_addresses;
use super::spec::{GuestSpec, GuestState};
use crate::error::{ProviderError, Result};
use crate::net::{is_ipv6_link_local, same_host_suffix};
use crate::units::{megabytes_string, to_megabytes};
use feilong_api::Gateway;

/// Remote changes an accepted update requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// New vCPU count, when it grows
    pub resize_cpus: Option<u32>,
    /// New memory size in megabytes, when it grows
    pub resize_memory: Option<u64>,
    /// State to persist once the changes are applied; addresses are still
    /// the prior ones until refreshed.
    pub next: GuestState,
}

impl UpdatePlan {
    /// Whether the update needs no remote change.
    pub fn is_noop(&self) -> bool {
        self.resize_cpus.is_none() && self.resize_memory.is_none()
    }
}

fn immutable(field: &'static str, old: &str, new: &str) -> ProviderError {
    ProviderError::ImmutableValue {
        field,
        old: old.to_string(),
        new: new.to_string(),
    }
}

fn ensure_unchanged(field: &'static str, old: &str, new: &str) -> Result<()> {
    if old != new {
        return Err(immutable(field, old, new));
    }
    Ok(())
}

fn ensure_same_file(field: &'static str, old: &Option<String>, new: &Option<String>) -> Result<()> {
    let old = old.as_deref().unwrap_or_default();
    let new = new.as_deref().unwrap_or_default();
    ensure_unchanged(field, old, new)
}

/// Compare a declared spec with the prior state and decide what to do.
///
/// Pure: makes no remote call.
///
/// # Errors
/// [`ProviderError::ImmutableValue`] or [`ProviderError::DecreaseNotAllowed`]
/// for the first disallowed change, and [`ProviderError::Conversion`] for a
/// malformed size.
pub fn plan_update(declared: &GuestSpec, prior: &GuestState) -> Result<UpdatePlan> {
    declared.validate()?;
    let userid = prior.userid.as_str();

    if let Some(new) = declared.userid.as_deref().filter(|u| !u.is_empty()) {
        ensure_unchanged("userid", &prior.userid, new)?;
    }

    let resize_cpus = if declared.vcpus < prior.vcpus {
        return Err(ProviderError::DecreaseNotAllowed {
            field: "vcpus",
            old: prior.vcpus.to_string(),
            new: declared.vcpus.to_string(),
        });
    } else if declared.vcpus > prior.vcpus {
        Some(declared.vcpus)
    } else {
        None
    };

    let mut resize_memory = None;
    if declared.memory != prior.memory {
        let old = to_megabytes(&prior.memory)?;
        let new = to_megabytes(&declared.memory)?;
        if new < old {
            return Err(ProviderError::DecreaseNotAllowed {
                field: "memory",
                old: prior.memory.clone(),
                new: declared.memory.clone(),
            });
        } else if new > old {
            resize_memory = Some(new);
        } else {
            tracing::info!(userid, old = %prior.memory, new = %declared.memory, "Not replacing memory size with equal value");
        }
    }

    if declared.disk != prior.disk {
        let old = to_megabytes(&prior.disk)?;
        let new = to_megabytes(&declared.disk)?;
        if new != old {
            return Err(immutable("disk", &prior.disk, &declared.disk));
        }
        tracing::info!(userid, old = %prior.disk, new = %declared.disk, "Not replacing disk size with equal value");
    }

    ensure_unchanged("image", &prior.image, &declared.image)?;
    ensure_unchanged("os_version", &prior.os_version, &declared.os_version)?;
    ensure_unchanged(
        "adapter_address",
        &prior.adapter_address,
        &declared.adapter_address,
    )?;

    if declared.mac != prior.mac {
        if !same_host_suffix(&prior.mac, &declared.mac) {
            return Err(immutable("mac", &prior.mac, &declared.mac));
        }
        tracing::info!(userid, old = %prior.mac, new = %declared.mac, "Not replacing MAC address with same last 3 bytes");
    }

    ensure_unchanged("vswitch", &prior.vswitch, &declared.vswitch)?;
    ensure_same_file(
        "cloudinit_params",
        &prior.cloudinit_params,
        &declared.cloudinit_params,
    )?;
    ensure_same_file(
        "network_params",
        &prior.network_params,
        &declared.network_params,
    )?;

    let mut next = GuestState::from_spec(declared, prior.userid.clone());
    next.mac_address = prior.mac_address.clone();
    next.ip_address = prior.ip_address.clone();

    Ok(UpdatePlan {
        resize_cpus,
        resize_memory,
        next,
    })
}

/// Validate and apply an update, then refresh the guest's addresses.
///
/// As on read, an IPv6 link-local address does not replace the known one.
///
/// # Errors
/// Planning errors are returned before any remote call. After that,
/// [`ProviderError::CpuResize`], [`ProviderError::MemoryResize`] and
/// [`ProviderError::AddressQuery`] report the step that failed.
pub async fn update_guest(
    gateway: &dyn Gateway,
    declared: &GuestSpec,
    prior: &GuestState,
) -> Result<GuestState> {
    let plan = plan_update(declared, prior).map_err(|e| {
        tracing::warn!(userid = %prior.userid, error = %e, "Guest update rejected");
        e
    })?;
    let userid = plan.next.userid.clone();

    if let Some(cpus) = plan.resize_cpus {
        gateway
            .live_resize_cpus(&userid, cpus)
            .await
            .map_err(ProviderError::CpuResize)?;
        tracing::info!(userid = %userid, old = prior.vcpus, new = cpus, "Increased number of vCPUs");
    }

    if let Some(memory) = plan.resize_memory {
        gateway
            .live_resize_memory(&userid, &megabytes_string(memory))
            .await
            .map_err(ProviderError::MemoryResize)?;
        tracing::info!(userid = %userid, old = %prior.memory, new = %plan.next.memory, "Increased memory size");
    }

    let addresses = read_addresses(gateway, &userid).await?;
    let mut next = plan.next;
    next.mac_address = addresses.mac_address;
    if is_ipv6_link_local(&addresses.ip_version, &addresses.ip_address) {
        tracing::info!(userid = %userid, ip_address = %next.ip_address, live = %addresses.ip_address, "Not replacing IP address with IPv6 link-local address");
    } else {
        next.ip_address = addresses.ip_address;
    }
    tracing::debug!(userid = %userid, "Guest updated");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior() -> GuestState {
        let mut spec = GuestSpec::new("testacc", "sles15", "sles15.7");
        spec.vcpus = 2;
        spec.memory = "1G".into();
        spec.disk = "10240M".into();
        spec.mac = "02:00:00:78:9a:bc".into();
        let mut state = GuestState::from_spec(&spec, "TESTACC");
        state.ip_address = "192.168.1.10".into();
        state
    }

    fn declared() -> GuestSpec {
        let mut spec = GuestSpec::new("testacc", "sles15", "sles15.7");
        spec.vcpus = 2;
        spec.memory = "1G".into();
        spec.disk = "10240M".into();
        spec.mac = "02:00:00:78:9a:bc".into();
        spec
    }

    #[test]
    fn test_unchanged_is_noop() {
        let plan = plan_update(&declared(), &prior()).unwrap();
        assert!(plan.is_noop());
        assert_eq!(plan.next, prior());
    }

    #[test]
    fn test_vcpu_policy() {
        let mut spec = declared();
        spec.vcpus = 4;
        assert_eq!(plan_update(&spec, &prior()).unwrap().resize_cpus, Some(4));

        spec.vcpus = 1;
        assert!(matches!(
            plan_update(&spec, &prior()),
            Err(ProviderError::DecreaseNotAllowed { field: "vcpus", .. })
        ));
    }

    #[test]
    fn test_memory_policy() {
        let mut spec = declared();
        spec.memory = "1024M".into();
        let plan = plan_update(&spec, &prior()).unwrap();
        assert!(plan.is_noop());
        assert_eq!(plan.next.memory, "1024M");

        spec.memory = "2G".into();
        assert_eq!(
            plan_update(&spec, &prior()).unwrap().resize_memory,
            Some(2_048)
        );

        spec.memory = "512M".into();
        assert!(matches!(
            plan_update(&spec, &prior()),
            Err(ProviderError::DecreaseNotAllowed { field: "memory", .. })
        ));
    }

    #[test]
    fn test_disk_policy() {
        let mut spec = declared();
        spec.disk = "10G".into();
        assert!(plan_update(&spec, &prior()).unwrap().is_noop());

        spec.disk = "20G".into();
        assert!(matches!(
            plan_update(&spec, &prior()),
            Err(ProviderError::ImmutableValue { field: "disk", .. })
        ));
    }

    #[test]
    fn test_mac_policy() {
        let mut spec = declared();
        spec.mac = "11:11:11:78:9A:BC".into();
        assert!(plan_update(&spec, &prior()).is_ok());

        spec.mac = "02:00:00:78:9a:bd".into();
        assert!(matches!(
            plan_update(&spec, &prior()),
            Err(ProviderError::ImmutableValue { field: "mac", .. })
        ));
    }

    #[test]
    fn test_immutable_attributes() {
        let cases: Vec<(&str, Box<dyn Fn(&mut GuestSpec)>)> = vec![
            ("userid", Box::new(|s| s.userid = Some("OTHER".into()))),
            ("image", Box::new(|s| s.image = "rhel9".into())),
            ("os_version", Box::new(|s| s.os_version = "sles15.6".into())),
            ("adapter_address", Box::new(|s| s.adapter_address = "2000".into())),
            ("vswitch", Box::new(|s| s.vswitch = "PRIVNET".into())),
            ("cloudinit_params", Box::new(|s| s.cloudinit_params = Some("/tmp/ci.iso".into()))),
        ];
        for (expected, change) in cases {
            let mut spec = declared();
            change(&mut spec);
            match plan_update(&spec, &prior()) {
                Err(ProviderError::ImmutableValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_name_is_free_and_userid_kept() {
        let mut spec = declared();
        spec.name = "renamed".into();
        let plan = plan_update(&spec, &prior()).unwrap();
        assert_eq!(plan.next.name, "renamed");
        assert_eq!(plan.next.userid, "TESTACC");
    }
}
