//! Aggregate service facade.
//!
//! `OvirtService` exposes the caller-facing lifecycle operations. Each
//! operation is a self-contained unit: it acquires its own engine
//! session, performs its work, and releases the session on every exit
//! path — success, validation failure, remote failure or timeout. The
//! client value is passed explicitly into every component; nothing is
//! shared across operations. Nothing here prints: every operation
//! returns a structured result and presentation belongs to the caller.

use std::time::Duration;

use chrono::Utc;

use crate::attach::Attacher;
use crate::engine::EngineClient;
use crate::error::OvirtResult;
use crate::inventory::InventoryManager;
use crate::plan;
use crate::resolve;
use crate::types::{
    AttachmentOutcome, CreateReport, EngineConfig, EngineSummary, PowerReport, PowerState,
    RemoveReport, VmDetails, VmHandle, VmPlan,
};
use crate::vm::VmManager;
use crate::watcher::{self, DEFAULT_POLL_INTERVAL};

/// Top-level service holding the engine configuration. Stateless
/// between operations: every call opens and closes its own session.
pub struct OvirtService {
    config: EngineConfig,
}

impl OvirtService {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    async fn open_session(&self) -> OvirtResult<EngineClient> {
        EngineClient::connect(&self.config).await
    }

    // ── Caller-facing operations ────────────────────────────────────

    /// List all VMs as resolved handles.
    pub async fn list_vms(&self) -> OvirtResult<Vec<VmHandle>> {
        let client = self.open_session().await?;
        let result = InventoryManager::new(&client).list().await;
        client.close().await;
        result
    }

    /// Create a VM from a declarative document, then attach its disks
    /// and NICs in document order.
    ///
    /// The whole document — disks and NICs included — is validated
    /// before any remote call, so a malformed entry can never leave an
    /// orphaned VM behind. Attachment failures after creation do not
    /// roll the VM back: the returned [`CreateReport`] enumerates the
    /// outcome of every entry.
    pub async fn create_vm(&self, doc: &serde_yaml::Value) -> OvirtResult<CreateReport> {
        let vm_plan = plan::build_plan(doc)?;
        let client = self.open_session().await?;
        let result = create_with(&client, &vm_plan).await;
        client.close().await;
        result
    }

    /// Start a VM by id or name and wait until it reports `Up`.
    pub async fn start_vm(&self, token: &str, timeout: Duration) -> OvirtResult<PowerReport> {
        let client = self.open_session().await?;
        let result = power_with(&client, token, PowerState::Up, timeout).await;
        client.close().await;
        result
    }

    /// Stop a VM by id or name and wait until it reports `Down`.
    pub async fn stop_vm(&self, token: &str, timeout: Duration) -> OvirtResult<PowerReport> {
        let client = self.open_session().await?;
        let result = power_with(&client, token, PowerState::Down, timeout).await;
        client.close().await;
        result
    }

    /// Remove a VM by id or name.
    pub async fn remove_vm(&self, token: &str) -> OvirtResult<RemoveReport> {
        let client = self.open_session().await?;
        let result = remove_with(&client, token).await;
        client.close().await;
        result
    }

    /// Full attribute snapshot of a VM resolved by id or name.
    pub async fn describe_vm(&self, token: &str) -> OvirtResult<VmDetails> {
        let client = self.open_session().await?;
        let result = describe_with(&client, token).await;
        client.close().await;
        result
    }

    /// Engine-wide summary counts and product version.
    pub async fn summary(&self) -> OvirtResult<EngineSummary> {
        let client = self.open_session().await?;
        let result = InventoryManager::new(&client).summary().await;
        client.close().await;
        result
    }
}

// ── Per-operation bodies (session already open) ─────────────────────

async fn create_with(client: &EngineClient, vm_plan: &VmPlan) -> OvirtResult<CreateReport> {
    let created = VmManager::new(client).create(vm_plan).await?;
    let attacher = Attacher::new(client);

    let mut disks = Vec::with_capacity(vm_plan.disks.len());
    for (index, disk) in vm_plan.disks.iter().enumerate() {
        let error = attacher.attach_disk(&created.id, disk).await.err();
        if let Some(ref e) = error {
            log::warn!("VM '{}': disk entry {index} failed: {e}", created.name);
        }
        disks.push(AttachmentOutcome { index, name: disk.name.clone(), error });
    }

    let mut nics = Vec::with_capacity(vm_plan.networks.len());
    for (index, nic) in vm_plan.networks.iter().enumerate() {
        let error = attacher.attach_nic(&created, nic).await.err();
        if let Some(ref e) = error {
            log::warn!("VM '{}': NIC entry {index} failed: {e}", created.name);
        }
        nics.push(AttachmentOutcome { index, name: nic.nic_name.clone(), error });
    }

    log::info!("VM '{}' created ({})", created.name, created.id);
    Ok(CreateReport {
        vm: VmHandle { id: created.id, name: created.name },
        disks,
        nics,
        completed_at: Utc::now().to_rfc3339(),
    })
}

async fn power_with(
    client: &EngineClient,
    token: &str,
    target: PowerState,
    timeout: Duration,
) -> OvirtResult<PowerReport> {
    let handle = resolve::resolve(client, token).await?;
    let vms = VmManager::new(client);
    match target {
        PowerState::Up => vms.start(&handle.id).await?,
        _ => vms.stop(&handle.id).await?,
    }
    watcher::wait_for_state(client, &handle.id, target, DEFAULT_POLL_INTERVAL, timeout).await?;
    log::info!("VM '{}' reached {target:?}", handle.name);
    Ok(PowerReport {
        vm: handle,
        state: target,
        completed_at: Utc::now().to_rfc3339(),
    })
}

async fn remove_with(client: &EngineClient, token: &str) -> OvirtResult<RemoveReport> {
    let handle = resolve::resolve(client, token).await?;
    VmManager::new(client).remove(&handle.id).await?;
    log::info!("VM '{}' removed", handle.name);
    Ok(RemoveReport { vm: handle, completed_at: Utc::now().to_rfc3339() })
}

async fn describe_with(client: &EngineClient, token: &str) -> OvirtResult<VmDetails> {
    let handle = resolve::resolve(client, token).await?;
    InventoryManager::new(client).describe(&handle.id).await
}
