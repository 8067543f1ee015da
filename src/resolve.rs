//! Identifier resolution.
//!
//! A user-supplied token is either an opaque VM id (canonical UUID
//! shape) or a free-form name. Ids are fetched directly; names go
//! through exactly one server-side filtered search.

use crate::engine::EngineClient;
use crate::error::{OvirtError, OvirtErrorKind, OvirtResult};
use crate::types::VmHandle;
use crate::vm::VmManager;

/// Positions of the separators in the canonical UUID shape.
const HYPHENS: [usize; 4] = [8, 13, 18, 23];
const ID_LEN: usize = 36;

/// True iff the token has the canonical VM-id shape: 36 characters
/// with hyphens exactly at positions 8, 13, 18 and 23.
pub fn looks_like_vm_id(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.len() != ID_LEN {
        return false;
    }
    bytes
        .iter()
        .enumerate()
        .all(|(i, b)| (*b == b'-') == HYPHENS.contains(&i))
}

/// Resolve a token to a canonical [`VmHandle`].
///
/// Name resolution takes the first match in the engine's own listing
/// order; when several VMs share the name this is a documented
/// ambiguity, not something this layer second-guesses.
pub async fn resolve(client: &EngineClient, token: &str) -> OvirtResult<VmHandle> {
    let vms = VmManager::new(client);

    if looks_like_vm_id(token) {
        log::debug!("Resolving '{token}' as a VM id");
        let vm = vms.get(token).await.map_err(|e| {
            if e.kind == OvirtErrorKind::NotFound {
                OvirtError::not_found(format!("no VM with id \"{token}\""))
            } else {
                e
            }
        })?;
        return Ok(VmHandle { id: vm.id, name: vm.name });
    }

    log::debug!("Resolving '{token}' as a VM name");
    let matches = vms.search(&format!("name={token}")).await?;
    if matches.len() > 1 {
        log::warn!(
            "{} VMs named '{token}'; proceeding with the first listed",
            matches.len()
        );
    }
    let vm = matches
        .into_iter()
        .next()
        .ok_or_else(|| OvirtError::not_found(format!("no VM named \"{token}\"")))?;
    Ok(VmHandle { id: vm.id, name: vm.name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_shape_is_an_id() {
        assert!(looks_like_vm_id("12345678-1234-1234-1234-123456789012"));
        assert!(looks_like_vm_id("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee"));
    }

    #[test]
    fn wrong_length_is_a_name() {
        assert!(!looks_like_vm_id(""));
        assert!(!looks_like_vm_id("web01"));
        assert!(!looks_like_vm_id("12345678-1234-1234-1234-12345678901"));
        assert!(!looks_like_vm_id("12345678-1234-1234-1234-1234567890123"));
    }

    #[test]
    fn four_hyphens_in_wrong_positions_is_a_name() {
        // Same length and hyphen count as an id, but shifted.
        assert!(!looks_like_vm_id("1234567-81234-1234-1234-123456789012"));
        assert!(!looks_like_vm_id("-2345678.1234-1234-1234-123456789012"));
    }

    #[test]
    fn extra_hyphens_is_a_name() {
        assert!(!looks_like_vm_id("12345678-1234-1234-1234-123456-89012"));
    }

    #[test]
    fn hyphenated_hostname_is_a_name() {
        assert!(!looks_like_vm_id("my-very-long-production-vm-name-0001"));
    }
}
