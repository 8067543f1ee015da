//! VM collection operations against the engine REST API.
//!
//! Thin, typed wrappers over `/vms`: listing, server-side search,
//! create, remove, and the start/stop power actions. Sequencing and
//! waiting live in `service` and `watcher`.

use crate::engine::EngineClient;
use crate::error::{OvirtError, OvirtResult};
use crate::types::{PowerState, VmCreateBody, VmList, VmPlan, VmRecord};

/// VM operations backed by an [`EngineClient`].
pub struct VmManager<'a> {
    client: &'a EngineClient,
}

impl<'a> VmManager<'a> {
    pub fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    // ── List / Get ──────────────────────────────────────────────────

    /// List all VMs in the engine's own listing order.
    pub async fn list(&self) -> OvirtResult<Vec<VmRecord>> {
        let list: VmList = self.client.get("/vms").await?;
        Ok(list.vms)
    }

    /// Server-side filtered listing, e.g. `name=web01`.
    pub async fn search(&self, query: &str) -> OvirtResult<Vec<VmRecord>> {
        let list: VmList = self
            .client
            .get_with_params("/vms", &[("search", query)])
            .await?;
        Ok(list.vms)
    }

    /// Fetch one VM by id.
    pub async fn get(&self, vm_id: &str) -> OvirtResult<VmRecord> {
        self.client.get(&format!("/vms/{vm_id}")).await
    }

    // ── Create / Remove ─────────────────────────────────────────────

    /// Create a VM from a validated plan. Returns the engine's record
    /// of the new VM (disks and NICs are attached separately).
    pub async fn create(&self, plan: &VmPlan) -> OvirtResult<VmRecord> {
        let body = VmCreateBody::from_plan(plan);
        log::info!(
            "Creating VM '{}' in cluster '{}' ({} bytes memory)",
            plan.name,
            plan.cluster_name,
            plan.memory_bytes
        );
        self.client.post("/vms", &body).await
    }

    /// Remove a VM by id.
    pub async fn remove(&self, vm_id: &str) -> OvirtResult<()> {
        self.client.delete(&format!("/vms/{vm_id}")).await
    }

    // ── Power actions ───────────────────────────────────────────────

    /// Issue the start action. Returns immediately; the state settles
    /// asynchronously (see `watcher`).
    pub async fn start(&self, vm_id: &str) -> OvirtResult<()> {
        self.client.post_empty(&format!("/vms/{vm_id}/start")).await
    }

    /// Issue the stop action.
    pub async fn stop(&self, vm_id: &str) -> OvirtResult<()> {
        self.client.post_empty(&format!("/vms/{vm_id}/stop")).await
    }

    /// Re-read the current power state from the engine. Never cached.
    pub async fn power_state(&self, vm_id: &str) -> OvirtResult<PowerState> {
        let vm = self.get(vm_id).await?;
        vm.status.ok_or_else(|| {
            OvirtError::parse(format!("engine reported no status for VM {vm_id}"))
        })
    }
}
