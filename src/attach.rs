//! Disk and NIC attachment.
//!
//! Attachments run strictly after VM creation, in document order, one
//! at a time. A NIC attachment has to walk the engine's object graph
//! first: the VM's cluster owns a data center, the data center owns the
//! candidate networks, and the NIC itself is bound to a vNIC profile
//! resolved by name. Any miss along that chain fails the entry with an
//! `Attachment` error; it never attaches with a null profile.

use crate::engine::EngineClient;
use crate::error::{OvirtError, OvirtResult};
use crate::types::{
    ClusterRecord, DataCenterList, DiskAttachmentBody, DiskPlan, NetworkList, NicBody, NicPlan,
    VmRecord, VnicProfileList, VnicProfileRef,
};

/// Attachment operations backed by an [`EngineClient`].
pub struct Attacher<'a> {
    client: &'a EngineClient,
}

impl<'a> Attacher<'a> {
    pub fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    /// Attach one disk. Size is converted GiB → bytes inside the wire
    /// body; the storage domain is referenced by name and resolved by
    /// the engine.
    pub async fn attach_disk(&self, vm_id: &str, disk: &DiskPlan) -> OvirtResult<()> {
        let body = DiskAttachmentBody::from_plan(disk);
        log::debug!(
            "Attaching disk '{}' ({} GiB, {}) to VM {vm_id}",
            disk.name,
            disk.provisioned_size_gib,
            disk.format.as_api_str()
        );
        self.client
            .post::<_, serde_json::Value>(&format!("/vms/{vm_id}/diskattachments"), &body)
            .await
            .map_err(|e| {
                OvirtError::attachment(format!(
                    "disk \"{}\" could not be attached: {}",
                    disk.name, e.message
                ))
            })?;
        Ok(())
    }

    /// Attach one NIC, resolving cluster → data center → network →
    /// vNIC profile by exact names.
    pub async fn attach_nic(&self, vm: &VmRecord, nic: &NicPlan) -> OvirtResult<()> {
        let entry_err = |msg: String| {
            OvirtError::attachment(format!("NIC \"{}\": {msg}", nic.nic_name))
        };

        let cluster_ref = vm
            .cluster
            .as_ref()
            .ok_or_else(|| entry_err(format!("VM \"{}\" reports no cluster", vm.name)))?;
        let cluster: ClusterRecord = self
            .client
            .get(&format!("/clusters/{}", cluster_ref.id))
            .await
            .map_err(|e| entry_err(format!("cannot resolve cluster: {}", e.message)))?;

        let dc_query = format!("Clusters.name={}", cluster.name);
        let dcs: DataCenterList = self
            .client
            .get_with_params("/datacenters", &[("search", dc_query.as_str())])
            .await
            .map_err(|e| entry_err(format!("cannot resolve data center: {}", e.message)))?;
        let dc = dcs.data_centers.into_iter().next().ok_or_else(|| {
            entry_err(format!("no data center owns cluster \"{}\"", cluster.name))
        })?;

        let networks: NetworkList = self
            .client
            .get(&format!("/datacenters/{}/networks", dc.id))
            .await
            .map_err(|e| entry_err(format!("cannot list networks: {}", e.message)))?;
        let network = networks
            .networks
            .into_iter()
            .find(|n| n.name == nic.network_name)
            .ok_or_else(|| {
                entry_err(format!(
                    "network \"{}\" not found in data center \"{}\"",
                    nic.network_name, dc.name
                ))
            })?;

        let profiles: VnicProfileList = self
            .client
            .get("/vnicprofiles")
            .await
            .map_err(|e| entry_err(format!("cannot list vNIC profiles: {}", e.message)))?;
        let profile = profiles
            .profiles
            .into_iter()
            .find(|p| p.name == nic.network_name)
            .ok_or_else(|| {
                entry_err(format!(
                    "no vNIC profile named \"{}\" is visible to this session",
                    nic.network_name
                ))
            })?;

        log::debug!(
            "Attaching NIC '{}' (network '{}', profile {}) to VM {}",
            nic.nic_name,
            network.name,
            profile.id,
            vm.id
        );
        let body = NicBody {
            name: nic.nic_name.clone(),
            description: nic.description.clone(),
            vnic_profile: VnicProfileRef { id: profile.id },
        };
        self.client
            .post::<_, serde_json::Value>(&format!("/vms/{}/nics", vm.id), &body)
            .await
            .map_err(|e| entry_err(format!("engine rejected the NIC: {}", e.message)))?;
        Ok(())
    }
}
