//! Read-only inventory and introspection.

use crate::engine::EngineClient;
use crate::error::OvirtResult;
use crate::types::{ApiRoot, EngineSummary, VmDetails, VmHandle};
use crate::vm::VmManager;

/// Read-only listing and attribute retrieval, reused by the resolver
/// and by reporting operations.
pub struct InventoryManager<'a> {
    client: &'a EngineClient,
}

impl<'a> InventoryManager<'a> {
    pub fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    /// List every VM as a resolved handle, in engine listing order.
    /// One remote round-trip.
    pub async fn list(&self) -> OvirtResult<Vec<VmHandle>> {
        let vms = VmManager::new(self.client).list().await?;
        Ok(vms
            .into_iter()
            .map(|vm| VmHandle { id: vm.id, name: vm.name })
            .collect())
    }

    /// Full attribute snapshot of one VM. No mutation, no side effects;
    /// two calls against an unchanged VM yield identical snapshots.
    pub async fn describe(&self, vm_id: &str) -> OvirtResult<VmDetails> {
        self.client.get(&format!("/vms/{vm_id}")).await
    }

    /// Engine-wide aggregate counts and product version from the API
    /// root service.
    pub async fn summary(&self) -> OvirtResult<EngineSummary> {
        let root: ApiRoot = self.client.get("").await?;
        Ok(EngineSummary::from_root(root))
    }
}
