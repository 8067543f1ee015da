//! Declarative plan builder.
//!
//! Turns a loosely-typed VM document (a `serde_yaml::Value` mapping)
//! into a fully-defaulted [`VmPlan`]. Validation is complete here: by
//! the time a plan exists, every disk and NIC entry has been checked,
//! so no remote call is ever made on behalf of a malformed document.
//!
//! Document layout (sizes are whole GiB):
//!
//! ```yaml
//! name: web01
//! os_type: rhel_9x64
//! common:
//!   cluster: Default
//!   template: Blank
//!   description: frontend
//! CPU:
//!   cores: 2
//!   sockets: 1
//! memory:
//!   memory: 4
//!   guaranteed: 2
//!   maximum: 8
//!   ballooning: true
//! disks:
//!   - name: web01_root
//!     format: cow
//!     interface: virtio
//!     provisioned_size: 20
//!     storage_domains: data
//!     bootable: true
//!     active: true
//! networks:
//!   - network: ovirtmgmt
//!     name: nic1
//! ```

use std::path::Path;

use serde_yaml::Value;

use crate::error::{OvirtError, OvirtResult};
use crate::types::{
    CpuTopologyPlan, DiskFormat, DiskInterface, DiskPlan, MemoryPolicyPlan, NicPlan, VmPlan,
};

/// Exact GiB → bytes multiplier. All size arithmetic is integer.
pub const GIB: u64 = 1024 * 1024 * 1024;

const NOT_PROVIDED: &str = "Not provided";

/// Read and parse a declarative VM document from a YAML file.
///
/// Convenience for callers; `build_plan` itself never touches the
/// filesystem.
pub fn load_document(path: &Path) -> OvirtResult<Value> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        OvirtError::validation(format!("cannot read VM document {}: {e}", path.display()))
    })?;
    serde_yaml::from_str(&raw).map_err(|e| {
        OvirtError::validation(format!("cannot parse VM document {}: {e}", path.display()))
    })
}

/// Build a fully-defaulted [`VmPlan`] from a declarative document.
///
/// Required fields are checked in a fixed order (`name`, `common`,
/// `CPU`, `memory`, then `memory.memory` and `common.cluster`); the
/// first missing one fails with a [`Validation`](crate::error::OvirtErrorKind::Validation)
/// error naming the field, before any defaulting happens.
pub fn build_plan(doc: &Value) -> OvirtResult<VmPlan> {
    if !doc.is_mapping() {
        return Err(OvirtError::validation("VM document must be a mapping"));
    }

    for required in ["name", "common", "CPU", "memory"] {
        if doc.get(required).is_none() {
            return Err(missing(required));
        }
    }

    let memory_doc = &doc["memory"];
    if memory_doc.get("memory").is_none() {
        return Err(missing("memory.memory"));
    }
    let common = &doc["common"];
    if common.get("cluster").is_none() {
        return Err(missing("common.cluster"));
    }

    let name = str_field(doc, "name")?;
    let os_type = opt_str_field(doc, "os_type")?.unwrap_or_else(|| "Other".to_string());

    let cpu_doc = &doc["CPU"];
    let cpu = CpuTopologyPlan {
        cores: cpu_count(cpu_doc, "cores")?,
        sockets: cpu_count(cpu_doc, "sockets")?,
        threads: cpu_count(cpu_doc, "threads")?,
    };

    let memory_gib = gib_field(memory_doc, "memory", "memory.memory")?;
    let memory_bytes = memory_gib * GIB;
    let guaranteed_bytes = match memory_doc.get("guaranteed") {
        Some(_) => gib_field(memory_doc, "guaranteed", "memory.guaranteed")? * GIB,
        None => memory_bytes / 2,
    };
    let max_bytes = match memory_doc.get("maximum") {
        Some(_) => gib_field(memory_doc, "maximum", "memory.maximum")? * GIB,
        None => memory_bytes * 2,
    };
    let ballooning_enabled = match memory_doc.get("ballooning") {
        Some(v) => v
            .as_bool()
            .ok_or_else(|| not_a("memory.ballooning", "boolean"))?,
        None => true,
    };

    let cluster_name = str_field_at(common, "cluster", "common.cluster")?;
    let template_name =
        opt_str_field_at(common, "template", "common.template")?.unwrap_or_else(|| "Blank".to_string());
    let description =
        opt_str_field_at(common, "description", "common.description")?
            .unwrap_or_else(|| NOT_PROVIDED.to_string());
    let comment = opt_str_field_at(common, "comment", "common.comment")?
        .unwrap_or_else(|| NOT_PROVIDED.to_string());

    let disks = match doc.get("disks") {
        Some(seq) => build_disks(seq)?,
        None => Vec::new(),
    };
    let networks = match doc.get("networks") {
        Some(seq) => build_nics(seq)?,
        None => Vec::new(),
    };

    Ok(VmPlan {
        name,
        os_type,
        cpu,
        memory_bytes,
        memory_policy: MemoryPolicyPlan {
            guaranteed_bytes,
            ballooning_enabled,
            max_bytes,
        },
        cluster_name,
        template_name,
        description,
        comment,
        disks,
        networks,
    })
}

fn build_disks(seq: &Value) -> OvirtResult<Vec<DiskPlan>> {
    let entries = seq
        .as_sequence()
        .ok_or_else(|| not_a("disks", "sequence"))?;

    let mut disks = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let at = |field: &str| format!("disks[{i}].{field}");

        let name = str_field_at(entry, "name", &at("name"))?;
        let description =
            opt_str_field_at(entry, "description", &at("description"))?
                .unwrap_or_else(|| NOT_PROVIDED.to_string());

        let format_raw = str_field_at(entry, "format", &at("format"))?;
        let format = DiskFormat::parse(&format_raw).ok_or_else(|| {
            OvirtError::validation(format!(
                "{}: unsupported disk format \"{format_raw}\" (supported: raw, cow)",
                at("format")
            ))
        })?;

        let interface_raw = str_field_at(entry, "interface", &at("interface"))?;
        let interface = DiskInterface::parse(&interface_raw).ok_or_else(|| {
            OvirtError::validation(format!(
                "{}: unsupported disk interface \"{interface_raw}\" (supported: virtio)",
                at("interface")
            ))
        })?;

        let provisioned_size_gib =
            gib_field(entry, "provisioned_size", &at("provisioned_size"))?;
        let storage_domain =
            str_field_at(entry, "storage_domains", &at("storage_domains"))?;
        let bootable = bool_field_at(entry, "bootable", &at("bootable"))?;
        let active = bool_field_at(entry, "active", &at("active"))?;

        disks.push(DiskPlan {
            name,
            description,
            format,
            provisioned_size_gib,
            interface,
            storage_domain,
            bootable,
            active,
        });
    }
    Ok(disks)
}

fn build_nics(seq: &Value) -> OvirtResult<Vec<NicPlan>> {
    let entries = seq
        .as_sequence()
        .ok_or_else(|| not_a("networks", "sequence"))?;

    let mut nics = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let at = |field: &str| format!("networks[{i}].{field}");

        nics.push(NicPlan {
            network_name: str_field_at(entry, "network", &at("network"))?,
            nic_name: str_field_at(entry, "name", &at("name"))?,
            description: opt_str_field_at(entry, "description", &at("description"))?
                .unwrap_or_else(|| NOT_PROVIDED.to_string()),
        });
    }
    Ok(nics)
}

// ── Field access helpers ────────────────────────────────────────────

fn missing(field: &str) -> OvirtError {
    OvirtError::validation(format!("missing required field \"{field}\" in VM document"))
}

fn not_a(field: &str, expected: &str) -> OvirtError {
    OvirtError::validation(format!("field \"{field}\" must be a {expected}"))
}

fn str_field(doc: &Value, field: &str) -> OvirtResult<String> {
    str_field_at(doc, field, field)
}

fn str_field_at(doc: &Value, field: &str, label: &str) -> OvirtResult<String> {
    match doc.get(field) {
        None => Err(missing(label)),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| not_a(label, "string")),
    }
}

fn opt_str_field(doc: &Value, field: &str) -> OvirtResult<Option<String>> {
    opt_str_field_at(doc, field, field)
}

fn opt_str_field_at(doc: &Value, field: &str, label: &str) -> OvirtResult<Option<String>> {
    match doc.get(field) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| not_a(label, "string")),
    }
}

fn bool_field_at(doc: &Value, field: &str, label: &str) -> OvirtResult<bool> {
    match doc.get(field) {
        None => Err(missing(label)),
        Some(v) => v.as_bool().ok_or_else(|| not_a(label, "boolean")),
    }
}

/// A size expressed in whole GiB: a non-negative integer scalar.
fn gib_field(doc: &Value, field: &str, label: &str) -> OvirtResult<u64> {
    match doc.get(field) {
        None => Err(missing(label)),
        Some(v) => v.as_u64().ok_or_else(|| {
            OvirtError::validation(format!(
                "field \"{label}\" must be a whole number of GiB"
            ))
        }),
    }
}

fn cpu_count(cpu_doc: &Value, field: &str) -> OvirtResult<u32> {
    match cpu_doc.get(field) {
        None => Ok(1),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| not_a(&format!("CPU.{field}"), "positive integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OvirtErrorKind;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    const MINIMAL: &str = "
name: web01
common:
  cluster: Default
CPU: {}
memory:
  memory: 4
";

    #[test]
    fn minimal_document_gets_all_defaults() {
        let plan = build_plan(&doc(MINIMAL)).unwrap();
        assert_eq!(plan.name, "web01");
        assert_eq!(plan.os_type, "Other");
        assert_eq!(plan.cpu, CpuTopologyPlan { cores: 1, sockets: 1, threads: 1 });
        assert_eq!(plan.memory_bytes, 4 * GIB);
        assert_eq!(plan.memory_policy.guaranteed_bytes, 2 * GIB);
        assert_eq!(plan.memory_policy.max_bytes, 8 * GIB);
        assert!(plan.memory_policy.ballooning_enabled);
        assert_eq!(plan.cluster_name, "Default");
        assert_eq!(plan.template_name, "Blank");
        assert_eq!(plan.description, "Not provided");
        assert_eq!(plan.comment, "Not provided");
        assert!(plan.disks.is_empty());
        assert!(plan.networks.is_empty());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let plan = build_plan(&doc(
            "
name: db01
os_type: rhel_9x64
common:
  cluster: Prod
  template: golden
  description: primary database
  comment: owned by dba
CPU:
  cores: 4
  sockets: 2
  threads: 2
memory:
  memory: 16
  guaranteed: 8
  maximum: 32
  ballooning: false
",
        ))
        .unwrap();
        assert_eq!(plan.os_type, "rhel_9x64");
        assert_eq!(plan.cpu, CpuTopologyPlan { cores: 4, sockets: 2, threads: 2 });
        assert_eq!(plan.memory_bytes, 16 * GIB);
        assert_eq!(plan.memory_policy.guaranteed_bytes, 8 * GIB);
        assert_eq!(plan.memory_policy.max_bytes, 32 * GIB);
        assert!(!plan.memory_policy.ballooning_enabled);
        assert_eq!(plan.template_name, "golden");
        assert_eq!(plan.description, "primary database");
        assert_eq!(plan.comment, "owned by dba");
    }

    #[test]
    fn missing_required_fields_fail_in_order() {
        for (yaml, field) in [
            ("common: {cluster: a}\nCPU: {}\nmemory: {memory: 1}", "name"),
            ("name: a\nCPU: {}\nmemory: {memory: 1}", "common"),
            ("name: a\ncommon: {cluster: a}\nmemory: {memory: 1}", "CPU"),
            ("name: a\ncommon: {cluster: a}\nCPU: {}", "memory"),
            ("name: a\ncommon: {cluster: a}\nCPU: {}\nmemory: {}", "memory.memory"),
            ("name: a\ncommon: {}\nCPU: {}\nmemory: {memory: 1}", "common.cluster"),
        ] {
            let err = build_plan(&doc(yaml)).unwrap_err();
            assert_eq!(err.kind, OvirtErrorKind::Validation, "{yaml}");
            assert!(
                err.message.contains(&format!("\"{field}\"")),
                "expected {field} in: {}",
                err.message
            );
        }
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        let err = build_plan(&doc("- just\n- a\n- list")).unwrap_err();
        assert_eq!(err.kind, OvirtErrorKind::Validation);
    }

    #[test]
    fn fractional_memory_is_rejected() {
        let err = build_plan(&doc(
            "name: a\ncommon: {cluster: c}\nCPU: {}\nmemory: {memory: 1.5}",
        ))
        .unwrap_err();
        assert_eq!(err.kind, OvirtErrorKind::Validation);
        assert!(err.message.contains("whole number of GiB"));
    }

    #[test]
    fn disks_parse_in_document_order() {
        let plan = build_plan(&doc(
            "
name: web01
common: {cluster: Default}
CPU: {}
memory: {memory: 4}
disks:
  - name: root
    format: cow
    interface: virtio
    provisioned_size: 20
    storage_domains: data
    bootable: true
    active: true
  - name: scratch
    format: RAW
    interface: virtio
    provisioned_size: 100
    storage_domains: bulk
    bootable: false
    active: false
",
        ))
        .unwrap();
        assert_eq!(plan.disks.len(), 2);
        assert_eq!(plan.disks[0].name, "root");
        assert_eq!(plan.disks[0].format, DiskFormat::Cow);
        assert_eq!(plan.disks[0].provisioned_size_gib, 20);
        assert!(plan.disks[0].bootable);
        assert_eq!(plan.disks[1].name, "scratch");
        assert_eq!(plan.disks[1].format, DiskFormat::Raw);
        assert_eq!(plan.disks[1].storage_domain, "bulk");
        assert!(!plan.disks[1].active);
        assert_eq!(plan.disks[1].description, "Not provided");
    }

    #[test]
    fn unsupported_disk_format_names_entry_and_value() {
        let err = build_plan(&doc(
            "
name: web01
common: {cluster: Default}
CPU: {}
memory: {memory: 4}
disks:
  - name: ok
    format: raw
    interface: virtio
    provisioned_size: 10
    storage_domains: data
    bootable: true
    active: true
  - name: bad
    format: zip
    interface: virtio
    provisioned_size: 10
    storage_domains: data
    bootable: false
    active: true
",
        ))
        .unwrap_err();
        assert_eq!(err.kind, OvirtErrorKind::Validation);
        assert!(err.message.contains("disks[1].format"));
        assert!(err.message.contains("\"zip\""));
    }

    #[test]
    fn missing_mandatory_disk_field_fails_whole_plan() {
        // No bootable flag on the only disk: the plan (and therefore the
        // whole create operation) must fail before any remote call.
        let err = build_plan(&doc(
            "
name: web01
common: {cluster: Default}
CPU: {}
memory: {memory: 4}
disks:
  - name: root
    format: cow
    interface: virtio
    provisioned_size: 20
    storage_domains: data
    active: true
",
        ))
        .unwrap_err();
        assert_eq!(err.kind, OvirtErrorKind::Validation);
        assert!(err.message.contains("disks[0].bootable"));
    }

    #[test]
    fn networks_parse_with_defaulted_description() {
        let plan = build_plan(&doc(
            "
name: web01
common: {cluster: Default}
CPU: {}
memory: {memory: 4}
networks:
  - network: ovirtmgmt
    name: nic1
  - network: storage
    name: nic2
    description: iSCSI leg
",
        ))
        .unwrap();
        assert_eq!(plan.networks.len(), 2);
        assert_eq!(plan.networks[0].network_name, "ovirtmgmt");
        assert_eq!(plan.networks[0].nic_name, "nic1");
        assert_eq!(plan.networks[0].description, "Not provided");
        assert_eq!(plan.networks[1].description, "iSCSI leg");
    }

    #[test]
    fn network_entry_missing_name_is_rejected() {
        let err = build_plan(&doc(
            "
name: web01
common: {cluster: Default}
CPU: {}
memory: {memory: 4}
networks:
  - network: ovirtmgmt
",
        ))
        .unwrap_err();
        assert_eq!(err.kind, OvirtErrorKind::Validation);
        assert!(err.message.contains("networks[0].name"));
    }
}
