//! Recording in-memory gateway shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use feilong_api::{
    ApiError, CreateGuestParams, CreateNetworkInterfaceParams, CreateVSwitchParams,
    DeployGuestParams, Gateway, GuestAdapter, GuestAdapters, GuestInfo, GuestMinidisks,
    Minidisk, Result, UpdateGuestNicParams, VSwitchDetails, VersionInfo,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One gateway call, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Version,
    CreateGuest(CreateGuestParams),
    CreateInterface(String, CreateNetworkInterfaceParams),
    UpdateNic(String, String, UpdateGuestNicParams),
    Deploy(String, DeployGuestParams),
    Start(String),
    ResizeCpus(String, u32),
    ResizeMemory(String, String),
    DeleteGuest(String),
    GuestInfo(String),
    Minidisks(String),
    Adapters(String),
    CreateVSwitch(CreateVSwitchParams),
    VSwitchDetails(String),
    DeleteVSwitch(String),
}

impl Call {
    /// Short name used to make calls fail.
    pub fn name(&self) -> &'static str {
        match self {
            Call::Version => "version",
            Call::CreateGuest(_) => "create_guest",
            Call::CreateInterface(..) => "create_interface",
            Call::UpdateNic(..) => "update_nic",
            Call::Deploy(..) => "deploy",
            Call::Start(_) => "start",
            Call::ResizeCpus(..) => "resize_cpus",
            Call::ResizeMemory(..) => "resize_memory",
            Call::DeleteGuest(_) => "delete_guest",
            Call::GuestInfo(_) => "guest_info",
            Call::Minidisks(_) => "minidisks",
            Call::Adapters(_) => "adapters",
            Call::CreateVSwitch(_) => "create_vswitch",
            Call::VSwitchDetails(_) => "vswitch_details",
            Call::DeleteVSwitch(_) => "delete_vswitch",
        }
    }
}

/// Gateway double that records every call and serves canned answers.
pub struct MockGateway {
    calls: Mutex<Vec<Call>>,
    fail: Mutex<Option<&'static str>>,
    pub version: Mutex<VersionInfo>,
    pub info: Mutex<GuestInfo>,
    pub minidisks: Mutex<GuestMinidisks>,
    /// Adapter answers served in order; the last one repeats.
    pub adapters: Mutex<VecDeque<GuestAdapters>>,
    pub vswitch: Mutex<VSwitchDetails>,
    /// How long each adapter query takes.
    pub adapters_latency: Mutex<Option<Duration>>,
}

pub fn adapter(mac: &str, ip: &str, ip_version: &str) -> GuestAdapters {
    GuestAdapters {
        adapters: vec![GuestAdapter {
            lan_owner: "SYSTEM".into(),
            lan_name: "DEVNET".into(),
            adapter_address: "1000".into(),
            adapter_status: "02".into(),
            mac_address: mac.into(),
            ip_address: ip.into(),
            ip_version: ip_version.into(),
        }],
    }
}

impl MockGateway {
    /// A running 2-vCPU, 1 GB guest with a 10 GB disk and a leased address.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: Mutex::new(None),
            version: Mutex::new(VersionInfo {
                version: "1.6.6".into(),
                api_version: "1.0".into(),
                max_version: "1.0".into(),
                min_version: "1.0".into(),
            }),
            info: Mutex::new(GuestInfo {
                max_mem_kb: 1_048_576,
                num_cpus: 2,
                power_state: "on".into(),
                ..Default::default()
            }),
            minidisks: Mutex::new(GuestMinidisks {
                minidisks: vec![Minidisk {
                    vdev: "0100".into(),
                    device_size: 14_564,
                    device_units: "Cylinders".into(),
                    ..Default::default()
                }],
            }),
            adapters: Mutex::new(VecDeque::from([adapter(
                "02:00:00:78:9A:BC",
                "192.168.1.10",
                "4",
            )])),
            vswitch: Mutex::new(VSwitchDetails::default()),
            adapters_latency: Mutex::new(None),
        }
    }

    /// Serve these adapter answers in order, repeating the last.
    pub fn with_adapters(self, answers: Vec<GuestAdapters>) -> Self {
        *self.adapters.lock().unwrap() = answers.into();
        self
    }

    /// Make every adapter query take `latency` before answering.
    pub fn with_adapters_latency(self, latency: Duration) -> Self {
        *self.adapters_latency.lock().unwrap() = Some(latency);
        self
    }

    /// Make the named call fail with a 500.
    pub fn fail_on(&self, call: &'static str) {
        *self.fail.lock().unwrap() = Some(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::name).collect()
    }

    fn record(&self, call: Call) -> Result<()> {
        let name = call.name();
        self.calls.lock().unwrap().push(call);
        if *self.fail.lock().unwrap() == Some(name) {
            return Err(ApiError::Status {
                status: 500,
                body: format!("{name} failed"),
            });
        }
        Ok(())
    }

    fn next_adapters(&self) -> GuestAdapters {
        let mut answers = self.adapters.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front().unwrap_or_default()
        } else {
            answers.front().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn version(&self) -> Result<VersionInfo> {
        self.record(Call::Version)?;
        Ok(self.version.lock().unwrap().clone())
    }

    async fn create_guest(&self, params: &CreateGuestParams) -> Result<()> {
        self.record(Call::CreateGuest(params.clone()))
    }

    async fn create_network_interface(
        &self,
        userid: &str,
        params: &CreateNetworkInterfaceParams,
    ) -> Result<()> {
        self.record(Call::CreateInterface(userid.into(), params.clone()))
    }

    async fn update_guest_nic(
        &self,
        userid: &str,
        vdev: &str,
        params: &UpdateGuestNicParams,
    ) -> Result<()> {
        self.record(Call::UpdateNic(userid.into(), vdev.into(), params.clone()))
    }

    async fn deploy_guest(&self, userid: &str, params: &DeployGuestParams) -> Result<()> {
        self.record(Call::Deploy(userid.into(), params.clone()))
    }

    async fn start_guest(&self, userid: &str) -> Result<()> {
        self.record(Call::Start(userid.into()))
    }

    async fn live_resize_cpus(&self, userid: &str, cpu_count: u32) -> Result<()> {
        self.record(Call::ResizeCpus(userid.into(), cpu_count))
    }

    async fn live_resize_memory(&self, userid: &str, size: &str) -> Result<()> {
        self.record(Call::ResizeMemory(userid.into(), size.into()))
    }

    async fn delete_guest(&self, userid: &str) -> Result<()> {
        self.record(Call::DeleteGuest(userid.into()))
    }

    async fn guest_info(&self, userid: &str) -> Result<GuestInfo> {
        self.record(Call::GuestInfo(userid.into()))?;
        Ok(self.info.lock().unwrap().clone())
    }

    async fn guest_minidisks(&self, userid: &str) -> Result<GuestMinidisks> {
        self.record(Call::Minidisks(userid.into()))?;
        Ok(self.minidisks.lock().unwrap().clone())
    }

    async fn guest_adapters(&self, userid: &str) -> Result<GuestAdapters> {
        self.record(Call::Adapters(userid.into()))?;
        let latency = *self.adapters_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.next_adapters())
    }

    async fn create_vswitch(&self, params: &CreateVSwitchParams) -> Result<()> {
        self.record(Call::CreateVSwitch(params.clone()))
    }

    async fn vswitch_details(&self, name: &str) -> Result<VSwitchDetails> {
        self.record(Call::VSwitchDetails(name.into()))?;
        Ok(self.vswitch.lock().unwrap().clone())
    }

    async fn delete_vswitch(&self, name: &str) -> Result<()> {
        self.record(Call::DeleteVSwitch(name.into()))
    }
}
