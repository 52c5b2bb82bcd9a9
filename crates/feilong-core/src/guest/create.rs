//! Guest provisioning pipeline.
//!
//! Create runs a fixed sequence of connector calls. A failing step aborts
//! the pipeline with an error naming that step; nothing already done is
//! undone, so the guest stays in whatever state the last successful step
//! left it.

use super::lease::LeaseWaiter;
use super::spec::{GuestSpec, GuestState};
use crate::config::ProviderContext;
use crate::error::{ProviderError, Result};
use crate::units::{megabytes_string, to_megabytes};
use feilong_api::{
    CreateGuestParams, CreateNetworkInterfaceParams, DeployGuestParams, Gateway, GuestDisk,
    GuestNetwork, UpdateGuestNicParams,
};
use tokio_util::sync::CancellationToken;

/// Provision, deploy and start a guest, then wait for its IP address.
///
/// Steps, in order:
/// 1. Resolve the user ID and convert sizes to megabytes
/// 2. Create the guest with one boot disk
/// 3. Define the first network interface
/// 4. Couple it to the virtual switch
/// 5. Deploy the image with the transport files
/// 6. Start the guest
/// 7. Wait for the lease
///
/// # Errors
/// Each step has its own error variant ([`ProviderError::Creation`],
/// [`ProviderError::NetworkConfiguration`], [`ProviderError::Coupling`],
/// [`ProviderError::Deployment`], [`ProviderError::Startup`], then the lease
/// errors). Validation and conversion errors occur before any remote call.
pub async fn create_guest(
    gateway: &dyn Gateway,
    ctx: &ProviderContext,
    spec: &GuestSpec,
    cancel: &CancellationToken,
) -> Result<GuestState> {
    let start = std::time::Instant::now();
    spec.validate()?;

    let userid = spec.resolved_userid();
    let memory = to_megabytes(&spec.memory)?;
    let disk = to_megabytes(&spec.disk)?;
    tracing::info!(
        userid = %userid,
        vcpus = spec.vcpus,
        memory_mb = memory,
        disk_mb = disk,
        image = %spec.image,
        "Creating guest"
    );

    let params = CreateGuestParams {
        userid: userid.clone(),
        vcpus: spec.vcpus,
        memory,
        user_profile: None,
        disk_list: vec![GuestDisk::boot(megabytes_string(disk))],
        max_cpu: None,
        max_mem: None,
    };
    gateway
        .create_guest(&params)
        .await
        .map_err(|e| stage_failed(&userid, "create", e, |source| ProviderError::Creation {
            resource: "guest",
            source,
        }))?;
    tracing::debug!(userid = %userid, "Guest defined");

    let interface = CreateNetworkInterfaceParams {
        os_version: spec.os_version.clone(),
        guest_networks: vec![GuestNetwork::dhcp(&spec.adapter_address, &spec.mac)],
        active: None,
    };
    gateway
        .create_network_interface(&userid, &interface)
        .await
        .map_err(|e| stage_failed(&userid, "interface", e, ProviderError::NetworkConfiguration))?;
    tracing::debug!(userid = %userid, vdev = %spec.adapter_address, "Network interface defined");

    gateway
        .update_guest_nic(
            &userid,
            &spec.adapter_address,
            &UpdateGuestNicParams::couple_to(&spec.vswitch),
        )
        .await
        .map_err(|e| stage_failed(&userid, "couple", e, ProviderError::Coupling))?;
    tracing::debug!(userid = %userid, vswitch = %spec.vswitch, "Interface coupled");

    let deploy = DeployGuestParams {
        image: spec.image.clone(),
        transport_files: spec.transport_files(),
        remote_host: ctx.local_user.clone(),
        ..Default::default()
    };
    gateway
        .deploy_guest(&userid, &deploy)
        .await
        .map_err(|e| stage_failed(&userid, "deploy", e, ProviderError::Deployment))?;
    tracing::debug!(
        userid = %userid,
        image = %spec.image,
        transport_files = deploy.transport_files.len(),
        "Image deployed"
    );

    gateway
        .start_guest(&userid)
        .await
        .map_err(|e| stage_failed(&userid, "start", e, ProviderError::Startup))?;
    tracing::debug!(userid = %userid, "Guest started");

    let lease = LeaseWaiter::new(gateway, &userid, ctx.lease)
        .wait(cancel)
        .await?;

    let mut state = GuestState::from_spec(spec, userid);
    state.mac_address = lease.mac_address;
    state.ip_address = lease.ip_address;
    tracing::info!(
        userid = %state.userid,
        ip_address = %state.ip_address,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Guest created"
    );
    Ok(state)
}

fn stage_failed(
    userid: &str,
    stage: &'static str,
    error: feilong_api::ApiError,
    wrap: impl FnOnce(feilong_api::ApiError) -> ProviderError,
) -> ProviderError {
    tracing::error!(userid = %userid, stage, error = %error, "Guest creation step failed");
    wrap(error)
}
