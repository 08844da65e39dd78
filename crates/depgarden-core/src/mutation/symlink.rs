//! Cross-package symlink — ghost one of two matching inner nodes.
//!
//! When two top-level containers both carry a dependency with the same
//! name, the lighter container gives its copy up: the node becomes a
//! zero-weight ghost pointing at the heavier container's copy. Ghosting is
//! terminal — a ghost is never un-ghosted.

use crate::model::PackageState;
use crate::store::GraphStore;

/// What a cross-package symlink did. `linked == false` means no change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymlinkOutcome {
    pub linked: bool,
    /// The container that now holds the ghost.
    pub ghost_container: String,
    pub ghost_id: String,
    /// The container holding the surviving real node.
    pub target_container: String,
    pub target_id: String,
    /// Weight removed from the ghost container and the global total.
    pub weight_saved: u64,
}

impl SymlinkOutcome {
    pub(crate) fn noop() -> Self {
        Self::default()
    }
}

/// Ghost the matching `name` node in whichever of the two containers is
/// lighter (tie favors the first argument). Zero-effect no-op when either
/// side has no non-ghost match left — re-invoking after a link is safe.
pub fn cross_package_symlink(
    store: &mut GraphStore,
    a_id: &str,
    b_id: &str,
    name: &str,
) -> SymlinkOutcome {
    if a_id == b_id {
        return SymlinkOutcome::noop();
    }

    // Validation reads, no writes yet.
    let a_size = match store.package_at(&[], a_id) {
        Some(p) if p.is_container() => p.size,
        _ => return SymlinkOutcome::noop(),
    };
    let b_size = match store.package_at(&[], b_id) {
        Some(p) if p.is_container() => p.size,
        _ => return SymlinkOutcome::noop(),
    };
    let a_path = vec![a_id.to_string()];
    let b_path = vec![b_id.to_string()];
    let a_node = match store.find_by_name(&a_path, name) {
        Some(n) => n.id.clone(),
        None => return SymlinkOutcome::noop(),
    };
    let b_node = match store.find_by_name(&b_path, name) {
        Some(n) => n.id.clone(),
        None => return SymlinkOutcome::noop(),
    };

    // The lighter container owns the ghost.
    let (owner, owner_node, target, target_node) = if b_size < a_size {
        (b_id, b_node, a_id, a_node)
    } else {
        (a_id, a_node, b_id, b_node)
    };
    let owner_path = vec![owner.to_string()];
    let target_path = vec![target.to_string()];

    // Ghosts can never be containers; a matching container copy is left
    // alone rather than having its nested graph destroyed.
    if store
        .package_at(&owner_path, &owner_node)
        .map(|p| p.is_container())
        .unwrap_or(true)
    {
        return SymlinkOutcome::noop();
    }

    let weight_saved;
    {
        let (packages, wires) = match store.scope_maps_mut(&owner_path) {
            Some(maps) => maps,
            None => return SymlinkOutcome::noop(),
        };
        let node = match packages.get_mut(&owner_node) {
            Some(n) => n,
            None => return SymlinkOutcome::noop(),
        };
        weight_saved = node.size;
        node.size = 0;
        node.is_ghost = true;
        node.ghost_target_id = Some(target_node.clone());
        node.ghost_target_scope = Some(target.to_string());
        node.state = PackageState::Optimized;
        // Ghosts cannot participate in conflicts.
        for wire in wires.values_mut() {
            if wire.touches(&owner_node) {
                wire.clear_conflict();
            }
        }
    }
    if let Some(real) = store.package_at_mut(&target_path, &target_node) {
        real.state = PackageState::Optimized;
    }

    store.debit_weight(weight_saved);
    store.sub_container_sizes(&owner_path, weight_saved);

    SymlinkOutcome {
        linked: true,
        ghost_container: owner.to_string(),
        ghost_id: owner_node,
        target_container: target.to_string(),
        target_id: target_node,
        weight_saved,
    }
}
