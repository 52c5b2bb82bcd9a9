//! Merging live guest attributes into persisted state.
//!
//! Live values only replace persisted ones when they differ in meaning:
//! sizes are compared in megabytes, MAC addresses on their last three bytes,
//! and an IPv6 link-local address never replaces a known address.

use super::spec::GuestState;
use crate::error::{ProviderError, Result};
use crate::net::{is_ipv6_link_local, same_host_suffix};
use crate::units::{cylinders_to_megabytes, megabytes_string, to_megabytes, CYLINDERS};
use feilong_api::Gateway;

/// Live attributes of a guest, fetched fresh on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestObservedState {
    pub vcpus: u32,
    pub max_mem_kb: u64,
    /// Units of the first minidisk's size
    pub disk_units: String,
    /// Size of the first minidisk in `disk_units`
    pub disk_size: u64,
    /// LAN the first adapter is coupled to
    pub vswitch: String,
    pub mac_address: String,
    pub ip_address: String,
    pub ip_version: String,
}

/// Fetch guest info, the first minidisk and the first adapter.
///
/// # Errors
/// [`ProviderError::Query`] if a request fails and
/// [`ProviderError::NotFound`] if the guest has no minidisk or no adapter.
pub async fn observe_guest(gateway: &dyn Gateway, userid: &str) -> Result<GuestObservedState> {
    let query = |resource: &'static str| {
        move |source: feilong_api::ApiError| {
            tracing::error!(userid = %userid, resource, error = %source, "Guest query failed");
            ProviderError::Query { resource, source }
        }
    };

    let info = gateway.guest_info(userid).await.map_err(query("guest"))?;

    let minidisks = gateway
        .guest_minidisks(userid)
        .await
        .map_err(query("minidisks"))?
        .minidisks;
    let disk = minidisks.first().ok_or(ProviderError::NotFound {
        resource: "minidisk",
        count: minidisks.len(),
    })?;

    let adapters = gateway
        .guest_adapters(userid)
        .await
        .map_err(query("adapters"))?
        .adapters;
    let adapter = adapters.first().ok_or(ProviderError::NotFound {
        resource: "network adapter",
        count: adapters.len(),
    })?;

    Ok(GuestObservedState {
        vcpus: info.num_cpus,
        max_mem_kb: info.max_mem_kb,
        disk_units: disk.device_units.clone(),
        disk_size: disk.device_size,
        vswitch: adapter.lan_name.clone(),
        mac_address: adapter.mac_address.clone(),
        ip_address: adapter.ip_address.clone(),
        ip_version: adapter.ip_version.clone(),
    })
}

/// Merge observed attributes into a copy of `state`.
///
/// The image, OS version and transport files cannot be observed after
/// deployment and are kept as persisted.
///
/// # Errors
/// [`ProviderError::Conversion`] if a persisted size is malformed and
/// [`ProviderError::UnknownUnit`] if the disk is not measured in cylinders.
pub fn reconcile(state: &GuestState, observed: &GuestObservedState) -> Result<GuestState> {
    let mut merged = state.clone();
    let userid = state.userid.as_str();

    merged.vcpus = observed.vcpus;

    let declared_memory = to_megabytes(&state.memory)?;
    let live_memory = observed.max_mem_kb / 1_024;
    if declared_memory == live_memory {
        tracing::info!(userid, memory = %state.memory, live_mb = live_memory, "Not replacing memory size with equal value");
    } else {
        merged.memory = megabytes_string(live_memory);
    }

    let declared_disk = to_megabytes(&state.disk)?;
    if observed.disk_units != CYLINDERS {
        return Err(ProviderError::UnknownUnit(observed.disk_units.clone()));
    }
    let live_disk = cylinders_to_megabytes(observed.disk_size);
    if declared_disk == live_disk {
        tracing::info!(userid, disk = %state.disk, live_mb = live_disk, "Not replacing disk size with equal value");
    } else {
        merged.disk = megabytes_string(live_disk);
    }

    merged.vswitch = observed.vswitch.clone();

    if same_host_suffix(&state.mac, &observed.mac_address) {
        tracing::info!(userid, mac = %state.mac, live = %observed.mac_address, "Not replacing MAC address with same last 3 bytes");
    } else {
        merged.mac = observed.mac_address.clone();
    }
    merged.mac_address = observed.mac_address.clone();

    if is_ipv6_link_local(&observed.ip_version, &observed.ip_address) {
        tracing::info!(userid, ip_address = %state.ip_address, live = %observed.ip_address, "Not replacing IP address with IPv6 link-local address");
    } else {
        merged.ip_address = observed.ip_address.clone();
    }

    Ok(merged)
}

/// Read a guest's live attributes and merge them into its state.
pub async fn read_guest(gateway: &dyn Gateway, state: &GuestState) -> Result<GuestState> {
    tracing::debug!(userid = %state.userid, "Reading guest");
    let observed = observe_guest(gateway, &state.userid).await?;
    let merged = reconcile(state, &observed)?;
    tracing::debug!(userid = %state.userid, changed = merged != *state, "Guest read");
    Ok(merged)
}
