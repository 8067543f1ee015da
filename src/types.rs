//! Shared types for oVirt / RHV engine management.
//!
//! Wire types follow the engine's JSON representation (snake_case,
//! collection envelopes keyed by the singular element name). Plan types
//! are the in-memory result of building a declarative VM document.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection / Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Top-level configuration for connecting to an oVirt / RHV engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine base URL, e.g. "https://engine.lab.local/ovirt-engine"
    pub url: String,
    /// Username including profile, e.g. "admin@internal"
    pub username: String,
    /// Password
    pub password: String,
    /// Path to a PEM CA certificate used as trust anchor
    #[serde(default)]
    pub ca_file: Option<String>,
    /// Skip TLS certificate verification (self-signed labs)
    #[serde(default)]
    pub insecure: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 { 30 }

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VM identity / Power State
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Resolved (id, name) pair identifying one remote VM.
///
/// Built by inventory lookup, immutable once resolved, discarded at the
/// end of the owning operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmHandle {
    pub id: String,
    pub name: String,
}

/// Engine-reported VM lifecycle state. Only `Up` and `Down` are terminal
/// targets for the state watcher; every other engine state collapses to
/// `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Up,
    Down,
    #[serde(other)]
    Other,
}

impl Default for PowerState {
    fn default() -> Self { Self::Other }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Wire records (engine → client)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reference to another engine resource by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

/// Concise VM record (from the collection listing).
#[derive(Debug, Clone, Deserialize)]
pub struct VmRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<PowerState>,
    #[serde(default)]
    pub cluster: Option<ResourceRef>,
}

/// `GET /vms` envelope: `{"vm": [...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct VmList {
    #[serde(default, rename = "vm")]
    pub vms: Vec<VmRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataCenterRecord {
    pub id: String,
    pub name: String,
}

/// `GET /datacenters` envelope: `{"data_center": [...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct DataCenterList {
    #[serde(default, rename = "data_center")]
    pub data_centers: Vec<DataCenterRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
}

/// `GET /datacenters/{id}/networks` envelope: `{"network": [...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct NetworkList {
    #[serde(default, rename = "network")]
    pub networks: Vec<NetworkRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VnicProfileRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub network: Option<ResourceRef>,
}

/// `GET /vnicprofiles` envelope: `{"vnic_profile": [...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct VnicProfileList {
    #[serde(default, rename = "vnic_profile")]
    pub profiles: Vec<VnicProfileRecord>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VM detail projection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read-only projection of a VM's engine attributes with explicit
/// optional fields. Loosely-shaped sub-documents (display, placement,
/// HA policy, ...) are carried as raw JSON values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub status: Option<PowerState>,
    #[serde(default, rename = "type")]
    pub vm_type: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub stateless: Option<bool>,
    #[serde(default)]
    pub delete_protected: Option<bool>,
    #[serde(default)]
    pub memory: Option<serde_json::Value>,
    #[serde(default)]
    pub memory_policy: Option<serde_json::Value>,
    #[serde(default)]
    pub cpu: Option<serde_json::Value>,
    #[serde(default)]
    pub os: Option<serde_json::Value>,
    #[serde(default)]
    pub bios: Option<serde_json::Value>,
    #[serde(default)]
    pub display: Option<serde_json::Value>,
    #[serde(default)]
    pub high_availability: Option<serde_json::Value>,
    #[serde(default)]
    pub placement_policy: Option<serde_json::Value>,
    #[serde(default)]
    pub io: Option<serde_json::Value>,
    #[serde(default)]
    pub usb: Option<serde_json::Value>,
    #[serde(default)]
    pub cluster: Option<ResourceRef>,
    #[serde(default)]
    pub template: Option<ResourceRef>,
    #[serde(default)]
    pub host: Option<ResourceRef>,
    #[serde(default)]
    pub quota: Option<ResourceRef>,
    #[serde(default)]
    pub cpu_profile: Option<ResourceRef>,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
    #[serde(default)]
    pub permissions: Option<serde_json::Value>,
    /// ISO-8601 lifecycle timestamps as reported by the engine.
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub stop_time: Option<String>,
}

impl VmDetails {
    /// Parsed creation timestamp, if present and well-formed.
    pub fn creation_time(&self) -> Option<DateTime<FixedOffset>> {
        parse_engine_time(self.creation_time.as_deref())
    }

    /// Parsed last-start timestamp, if present and well-formed.
    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        parse_engine_time(self.start_time.as_deref())
    }

    /// Parsed last-stop timestamp, if present and well-formed.
    pub fn stop_time(&self) -> Option<DateTime<FixedOffset>> {
        parse_engine_time(self.stop_time.as_deref())
    }
}

fn parse_engine_time(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Engine summary (root service)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
pub struct ApiRoot {
    #[serde(default)]
    pub product_info: Option<ProductInfo>,
    #[serde(default)]
    pub summary: Option<ApiSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub version: Option<VersionInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub full_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSummary {
    #[serde(default)]
    pub hosts: Option<TotalCount>,
    #[serde(default)]
    pub storage_domains: Option<TotalCount>,
    #[serde(default)]
    pub users: Option<TotalCount>,
    #[serde(default)]
    pub vms: Option<TotalCount>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TotalCount {
    #[serde(default)]
    pub total: u64,
}

/// Engine-wide aggregate counts from the API root service.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub product_version: String,
    pub hosts: u64,
    pub storage_domains: u64,
    pub users: u64,
    pub vms: u64,
}

impl EngineSummary {
    pub fn from_root(root: ApiRoot) -> Self {
        let product_version = root
            .product_info
            .and_then(|p| p.version)
            .and_then(|v| v.full_version)
            .unwrap_or_default();
        let summary = root.summary.unwrap_or_default();
        let total = |c: Option<TotalCount>| c.map(|c| c.total).unwrap_or(0);
        Self {
            product_version,
            hosts: total(summary.hosts),
            storage_domains: total(summary.storage_domains),
            users: total(summary.users),
            vms: total(summary.vms),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Declarative plan
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fully-defaulted creation plan for one VM. Built once per create
/// operation from the declarative document, immutable after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmPlan {
    pub name: String,
    pub os_type: String,
    pub cpu: CpuTopologyPlan,
    pub memory_bytes: u64,
    pub memory_policy: MemoryPolicyPlan,
    pub cluster_name: String,
    pub template_name: String,
    pub description: String,
    pub comment: String,
    pub disks: Vec<DiskPlan>,
    pub networks: Vec<NicPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTopologyPlan {
    pub cores: u32,
    pub sockets: u32,
    pub threads: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPolicyPlan {
    pub guaranteed_bytes: u64,
    pub ballooning_enabled: bool,
    pub max_bytes: u64,
}

/// Disk image format. `Cow` is sparse (thin provision), `Raw` is
/// preallocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFormat {
    Raw,
    Cow,
}

impl DiskFormat {
    /// String value expected by the engine REST API.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Cow => "cow",
        }
    }

    /// Parse a document value, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "raw" => Some(Self::Raw),
            "cow" => Some(Self::Cow),
            _ => None,
        }
    }
}

/// Disk bus the guest sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskInterface {
    Virtio,
}

impl DiskInterface {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Virtio => "virtio",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "virtio" => Some(Self::Virtio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskPlan {
    pub name: String,
    pub description: String,
    pub format: DiskFormat,
    pub provisioned_size_gib: u64,
    pub interface: DiskInterface,
    pub storage_domain: String,
    pub bootable: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicPlan {
    pub network_name: String,
    pub nic_name: String,
    pub description: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Wire bodies (client → engine)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reference to another engine resource by name (the engine resolves
/// the name server-side).
#[derive(Debug, Clone, Serialize)]
pub struct NameRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OsBody {
    #[serde(rename = "type")]
    pub os_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuTopologyBody {
    pub cores: u32,
    pub sockets: u32,
    pub threads: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuBody {
    pub topology: CpuTopologyBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryPolicyBody {
    pub guaranteed: u64,
    pub ballooning: bool,
    pub max: u64,
}

/// Create VM body matching `POST /api/vms`.
#[derive(Debug, Clone, Serialize)]
pub struct VmCreateBody {
    pub name: String,
    pub os: OsBody,
    pub cpu: CpuBody,
    pub memory: u64,
    pub memory_policy: MemoryPolicyBody,
    pub cluster: NameRef,
    pub template: NameRef,
    pub description: String,
    pub comment: String,
}

impl VmCreateBody {
    pub fn from_plan(plan: &VmPlan) -> Self {
        Self {
            name: plan.name.clone(),
            os: OsBody { os_type: plan.os_type.clone() },
            cpu: CpuBody {
                topology: CpuTopologyBody {
                    cores: plan.cpu.cores,
                    sockets: plan.cpu.sockets,
                    threads: plan.cpu.threads,
                },
            },
            memory: plan.memory_bytes,
            memory_policy: MemoryPolicyBody {
                guaranteed: plan.memory_policy.guaranteed_bytes,
                ballooning: plan.memory_policy.ballooning_enabled,
                max: plan.memory_policy.max_bytes,
            },
            cluster: NameRef { name: plan.cluster_name.clone() },
            template: NameRef { name: plan.template_name.clone() },
            description: plan.description.clone(),
            comment: plan.comment.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageDomainsBody {
    pub storage_domain: Vec<NameRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskBody {
    pub name: String,
    pub description: String,
    pub format: String,
    pub provisioned_size: u64,
    pub storage_domains: StorageDomainsBody,
}

/// Disk attachment body matching `POST /api/vms/{id}/diskattachments`.
#[derive(Debug, Clone, Serialize)]
pub struct DiskAttachmentBody {
    pub disk: DiskBody,
    pub interface: String,
    pub bootable: bool,
    pub active: bool,
}

impl DiskAttachmentBody {
    pub fn from_plan(plan: &DiskPlan) -> Self {
        Self {
            disk: DiskBody {
                name: plan.name.clone(),
                description: plan.description.clone(),
                format: plan.format.as_api_str().to_string(),
                provisioned_size: plan.provisioned_size_gib * crate::plan::GIB,
                storage_domains: StorageDomainsBody {
                    storage_domain: vec![NameRef { name: plan.storage_domain.clone() }],
                },
            },
            interface: plan.interface.as_api_str().to_string(),
            bootable: plan.bootable,
            active: plan.active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VnicProfileRef {
    pub id: String,
}

/// NIC body matching `POST /api/vms/{id}/nics`.
#[derive(Debug, Clone, Serialize)]
pub struct NicBody {
    pub name: String,
    pub description: String,
    pub vnic_profile: VnicProfileRef,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Operation reports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of one disk or NIC attachment, in document order.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentOutcome {
    /// Position of the entry in the declarative document list.
    pub index: usize,
    /// Disk name or NIC name from the document.
    pub name: String,
    /// The attachment error, if the entry failed.
    pub error: Option<crate::error::OvirtError>,
}

impl AttachmentOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Partial-success result of a create operation: the VM itself was
/// created; each attachment entry reports its own outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CreateReport {
    pub vm: VmHandle,
    pub disks: Vec<AttachmentOutcome>,
    pub nics: Vec<AttachmentOutcome>,
    /// ISO-8601 timestamp when the operation finished.
    pub completed_at: String,
}

impl CreateReport {
    /// True when every disk and NIC attachment succeeded.
    pub fn fully_attached(&self) -> bool {
        self.disks.iter().all(AttachmentOutcome::succeeded)
            && self.nics.iter().all(AttachmentOutcome::succeeded)
    }
}

/// Result of a start/stop operation after the state settled.
#[derive(Debug, Clone, Serialize)]
pub struct PowerReport {
    pub vm: VmHandle,
    pub state: PowerState,
    pub completed_at: String,
}

/// Result of a remove operation.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveReport {
    pub vm: VmHandle,
    pub completed_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_state_from_engine_json() {
        assert_eq!(serde_json::from_str::<PowerState>("\"up\"").unwrap(), PowerState::Up);
        assert_eq!(serde_json::from_str::<PowerState>("\"down\"").unwrap(), PowerState::Down);
        assert_eq!(
            serde_json::from_str::<PowerState>("\"wait_for_launch\"").unwrap(),
            PowerState::Other
        );
    }

    #[test]
    fn vm_list_envelope() {
        let json = r#"{"vm":[{"id":"a","name":"web01","status":"down",
            "cluster":{"id":"c1"}},{"id":"b","name":"web02"}]}"#;
        let list: VmList = serde_json::from_str(json).unwrap();
        assert_eq!(list.vms.len(), 2);
        assert_eq!(list.vms[0].status, Some(PowerState::Down));
        assert_eq!(list.vms[0].cluster.as_ref().unwrap().id, "c1");
        assert!(list.vms[1].status.is_none());
    }

    #[test]
    fn empty_vm_list_envelope() {
        let list: VmList = serde_json::from_str("{}").unwrap();
        assert!(list.vms.is_empty());
    }

    #[test]
    fn engine_summary_from_root() {
        let json = r#"{
            "product_info": {"version": {"full_version": "4.5.4-1.el8"}},
            "summary": {
                "hosts": {"total": 3, "active": 2},
                "storage_domains": {"total": 4},
                "users": {"total": 11},
                "vms": {"total": 25, "active": 7}
            }
        }"#;
        let root: ApiRoot = serde_json::from_str(json).unwrap();
        let summary = EngineSummary::from_root(root);
        assert_eq!(summary.product_version, "4.5.4-1.el8");
        assert_eq!(summary.hosts, 3);
        assert_eq!(summary.storage_domains, 4);
        assert_eq!(summary.users, 11);
        assert_eq!(summary.vms, 25);
    }

    #[test]
    fn details_timestamps_parse() {
        let json = r#"{"id":"a","name":"web01",
            "creation_time":"2024-09-14T12:25:25.831+02:00",
            "stop_time":"not-a-timestamp"}"#;
        let details: VmDetails = serde_json::from_str(json).unwrap();
        assert!(details.creation_time().is_some());
        assert!(details.start_time().is_none());
        assert!(details.stop_time().is_none());
    }

    #[test]
    fn create_body_serializes_memory_in_bytes() {
        let plan = VmPlan {
            name: "web01".into(),
            os_type: "Other".into(),
            cpu: CpuTopologyPlan { cores: 2, sockets: 1, threads: 1 },
            memory_bytes: 4 * crate::plan::GIB,
            memory_policy: MemoryPolicyPlan {
                guaranteed_bytes: 2 * crate::plan::GIB,
                ballooning_enabled: true,
                max_bytes: 8 * crate::plan::GIB,
            },
            cluster_name: "Default".into(),
            template_name: "Blank".into(),
            description: "Not provided".into(),
            comment: "Not provided".into(),
            disks: vec![],
            networks: vec![],
        };
        let body = serde_json::to_value(VmCreateBody::from_plan(&plan)).unwrap();
        assert_eq!(body["memory"], 4_294_967_296u64);
        assert_eq!(body["memory_policy"]["guaranteed"], 2_147_483_648u64);
        assert_eq!(body["memory_policy"]["max"], 8_589_934_592u64);
        assert_eq!(body["cpu"]["topology"]["cores"], 2);
        assert_eq!(body["os"]["type"], "Other");
        assert_eq!(body["cluster"]["name"], "Default");
        assert_eq!(body["template"]["name"], "Blank");
    }

    #[test]
    fn disk_attachment_body_converts_size_and_lowercases_enums() {
        let disk = DiskPlan {
            name: "root".into(),
            description: "Not provided".into(),
            format: DiskFormat::Cow,
            provisioned_size_gib: 20,
            interface: DiskInterface::Virtio,
            storage_domain: "data".into(),
            bootable: true,
            active: true,
        };
        let body = serde_json::to_value(DiskAttachmentBody::from_plan(&disk)).unwrap();
        assert_eq!(body["disk"]["provisioned_size"], 20 * 1024u64 * 1024 * 1024);
        assert_eq!(body["disk"]["format"], "cow");
        assert_eq!(body["interface"], "virtio");
        assert_eq!(body["disk"]["storage_domains"]["storage_domain"][0]["name"], "data");
        assert_eq!(body["bootable"], true);
    }

    #[test]
    fn disk_format_parse_is_case_insensitive() {
        assert_eq!(DiskFormat::parse("RAW"), Some(DiskFormat::Raw));
        assert_eq!(DiskFormat::parse("Cow"), Some(DiskFormat::Cow));
        assert_eq!(DiskFormat::parse("zip"), None);
        assert_eq!(DiskInterface::parse("VirtIO"), Some(DiskInterface::Virtio));
        assert_eq!(DiskInterface::parse("ide"), None);
    }
}
