//! Intra-scope symlink merge — absorb one duplicate package into another.
//!
//! The merge is validated completely before the first write, so an invalid
//! request (stale drag target, ghost, name mismatch) is a zero-effect
//! no-op rather than an error — such requests routinely arrive from stale
//! UI state and must not break the interaction loop.

use std::collections::BTreeSet;

use depgarden_logic::merge_rules::{self, KeepSide, MergeCandidate};

use crate::model::{WireKind, ROOT_ID};
use crate::store::GraphStore;

/// What a merge did. `merged == false` means nothing changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeOutcome {
    pub merged: bool,
    pub winner_id: String,
    pub loser_id: String,
    /// Weight subtracted from the global total (the non-retained portion
    /// of the loser's size).
    pub weight_destroyed: u64,
    /// Reparented subtree roots that the physics layer should relocate.
    /// Only populated at root scope.
    pub relocated: Vec<String>,
}

impl MergeOutcome {
    pub(crate) fn noop() -> Self {
        Self::default()
    }
}

/// Merge two same-named packages in the scope at `path`. The loser is
/// picked by tie-break (container-ness, depth, distance) regardless of
/// which argument was the drag source.
pub fn symlink_merge(
    store: &mut GraphStore,
    path: &[String],
    source_id: &str,
    target_id: &str,
    combo: u32,
) -> MergeOutcome {
    if source_id == target_id || source_id == ROOT_ID || target_id == ROOT_ID {
        return MergeOutcome::noop();
    }

    let weight_destroyed;
    let winner_id;
    let loser_id;
    let relocated;
    {
        let (packages, wires) = match store.scope_maps_mut(path) {
            Some(maps) => maps,
            None => return MergeOutcome::noop(),
        };

        // Validate everything before the first write.
        let (source, target) = match (packages.get(source_id), packages.get(target_id)) {
            (Some(s), Some(t)) => (s, t),
            _ => return MergeOutcome::noop(),
        };
        if source.is_ghost || target.is_ghost {
            return MergeOutcome::noop();
        }
        match (source.name(), target.name()) {
            (Some(a), Some(b)) if a == b => {}
            _ => return MergeOutcome::noop(),
        }

        let side = merge_rules::pick_winner(
            &MergeCandidate {
                is_container: source.is_container(),
                depth: source.depth,
                distance_sq: source.distance_sq(),
            },
            &MergeCandidate {
                is_container: target.is_container(),
                depth: target.depth,
                distance_sq: target.distance_sq(),
            },
        );
        let (win, lose) = match side {
            KeepSide::First => (source_id, target_id),
            KeepSide::Second => (target_id, source_id),
        };
        winner_id = win.to_string();
        loser_id = lose.to_string();

        let loser = match packages.remove(&loser_id) {
            Some(l) => l,
            None => return MergeOutcome::noop(),
        };
        weight_destroyed = merge_rules::weight_destroyed(loser.size, combo);

        // Rewire every edge touching the loser onto the winner, dropping
        // edges that would become loser<->winner loops or duplicate an
        // existing winner edge.
        let mut pairs: BTreeSet<(String, String)> = wires
            .values()
            .filter(|w| !w.touches(&loser_id))
            .map(|w| (w.from_id.clone(), w.to_id.clone()))
            .collect();
        let mut dropped: Vec<String> = Vec::new();
        let mut rewired: Vec<(String, String, String)> = Vec::new();
        for (id, wire) in wires.iter() {
            if !wire.touches(&loser_id) {
                continue;
            }
            let new_from = if wire.from_id == loser_id {
                winner_id.clone()
            } else {
                wire.from_id.clone()
            };
            let new_to = if wire.to_id == loser_id {
                winner_id.clone()
            } else {
                wire.to_id.clone()
            };
            if new_from == new_to || !pairs.insert((new_from.clone(), new_to.clone())) {
                dropped.push(id.clone());
            } else {
                rewired.push((id.clone(), new_from, new_to));
            }
        }
        for id in dropped {
            wires.remove(&id);
        }
        for (id, new_from, new_to) in rewired {
            if let Some(wire) = wires.get_mut(&id) {
                wire.from_id = new_from;
                wire.to_id = new_to;
                wire.kind = WireKind::Symlink;
                wire.clear_conflict();
            }
        }

        // Reparent the loser's children to the winner. The winner itself
        // may have been one of them; it takes over the loser's parent
        // instead of becoming its own child.
        let mut moved: Vec<String> = Vec::new();
        for child_id in &loser.children {
            if *child_id == winner_id {
                continue;
            }
            if let Some(child) = packages.get_mut(child_id) {
                child.parent_id = Some(winner_id.clone());
                moved.push(child_id.clone());
            }
        }
        if let Some(parent_id) = &loser.parent_id {
            if let Some(parent) = packages.get_mut(parent_id) {
                parent.children.retain(|c| *c != loser_id);
            }
        }
        let loser_parent = loser.parent_id.clone();
        let mut winner_adopted = false;
        if let Some(winner) = packages.get_mut(&winner_id) {
            if winner.parent_id.as_deref() == Some(loser_id.as_str()) {
                winner.parent_id = loser_parent.clone();
                winner_adopted = true;
            }
            for child_id in &moved {
                if !winner.children.contains(child_id) {
                    winner.children.push(child_id.clone());
                }
            }
        }
        if winner_adopted {
            if let Some(parent_id) = &loser_parent {
                if let Some(parent) = packages.get_mut(parent_id) {
                    if !parent.children.contains(&winner_id) {
                        parent.children.push(winner_id.clone());
                    }
                }
            }
        }
        relocated = if path.is_empty() { moved } else { Vec::new() };
    }

    store.debit_weight(weight_destroyed);
    store.sub_container_sizes(path, weight_destroyed);

    MergeOutcome {
        merged: true,
        winner_id,
        loser_id,
        weight_destroyed,
        relocated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identity, Package, Wire};

    fn named(id: &str, name: &str, size: u64) -> Package {
        Package::new(id, Some(ROOT_ID.into()))
            .with_identity(Identity::new(name, name))
            .with_size(size)
    }

    fn two_lodash_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.insert_package(&[], named("pkg-1", "lodash", 40).with_depth(1).at(10.0, 0.0));
        store.insert_package(&[], named("pkg-2", "lodash", 60).with_depth(1).at(50.0, 0.0));
        store
    }

    #[test]
    fn test_merge_destroys_floor_of_non_retained_weight() {
        let mut store = two_lodash_store();
        let before = store.global_weight();
        let outcome = symlink_merge(&mut store, &[], "pkg-2", "pkg-1", 0);
        assert!(outcome.merged);
        // pkg-1 wins on distance; loser pkg-2 (size 60) at retention 0.5.
        assert_eq!(outcome.winner_id, "pkg-1");
        assert_eq!(outcome.weight_destroyed, 30);
        assert_eq!(store.global_weight(), before - 30);
        assert!(store.package_at(&[], "pkg-2").is_none());
    }

    #[test]
    fn test_merge_symmetric_in_argument_order() {
        let mut a = two_lodash_store();
        let mut b = two_lodash_store();
        let first = symlink_merge(&mut a, &[], "pkg-1", "pkg-2", 0);
        let second = symlink_merge(&mut b, &[], "pkg-2", "pkg-1", 0);
        assert_eq!(first.winner_id, second.winner_id);
        assert_eq!(first.loser_id, second.loser_id);
    }

    #[test]
    fn test_lower_depth_wins_over_distance() {
        let mut store = GraphStore::new();
        store.insert_package(&[], named("pkg-1", "lodash", 10).with_depth(2).at(50.0, 0.0));
        store.insert_package(&[], named("pkg-2", "lodash", 10).with_depth(1).at(80.0, 0.0));
        let outcome = symlink_merge(&mut store, &[], "pkg-1", "pkg-2", 0);
        assert_eq!(outcome.winner_id, "pkg-2");
    }

    #[test]
    fn test_container_wins_over_depth() {
        let mut store = GraphStore::new();
        store.insert_package(
            &[],
            named("pkg-1", "lodash", 10).with_depth(3).into_container(),
        );
        store.insert_package(&[], named("pkg-2", "lodash", 10).with_depth(1));
        let outcome = symlink_merge(&mut store, &[], "pkg-2", "pkg-1", 0);
        assert_eq!(outcome.winner_id, "pkg-1");
    }

    #[test]
    fn test_mismatched_names_noop() {
        let mut store = GraphStore::new();
        store.insert_package(&[], named("pkg-1", "lodash", 10));
        store.insert_package(&[], named("pkg-2", "moment", 10));
        let outcome = symlink_merge(&mut store, &[], "pkg-1", "pkg-2", 0);
        assert!(!outcome.merged);
        assert_eq!(store.global_weight(), 20);
    }

    #[test]
    fn test_ghost_and_missing_targets_noop() {
        let mut store = two_lodash_store();
        store.package_at_mut(&[], "pkg-1").unwrap().is_ghost = true;
        assert!(!symlink_merge(&mut store, &[], "pkg-1", "pkg-2", 0).merged);
        assert!(!symlink_merge(&mut store, &[], "pkg-2", "pkg-9", 0).merged);
        assert!(!symlink_merge(&mut store, &[], "pkg-2", "pkg-2", 0).merged);
    }

    #[test]
    fn test_wires_rewired_to_winner_without_duplicates() {
        let mut store = two_lodash_store();
        store.insert_package(&[], Package::new("pkg-3", Some(ROOT_ID.into())));
        // pkg-3 depends on both duplicates; after the merge only one edge
        // to the winner may remain.
        store.insert_wire(&[], Wire::new("wire-1", "pkg-3", "pkg-1", WireKind::Dependency));
        store.insert_wire(&[], Wire::new("wire-2", "pkg-3", "pkg-2", WireKind::Dependency));
        // Direct edge between the duplicates must vanish entirely.
        store.insert_wire(&[], Wire::new("wire-3", "pkg-2", "pkg-1", WireKind::Dependency));

        symlink_merge(&mut store, &[], "pkg-1", "pkg-2", 0);

        let wires = store.wires_at(&[]);
        assert_eq!(wires.len(), 1);
        let survivor = wires.values().next().unwrap();
        assert_eq!(survivor.from_id, "pkg-3");
        assert_eq!(survivor.to_id, "pkg-1");
        // No wire references the deleted package.
        assert!(wires.values().all(|w| !w.touches("pkg-2")));
    }

    #[test]
    fn test_rewired_wire_becomes_symlink() {
        let mut store = two_lodash_store();
        store.insert_package(&[], Package::new("pkg-3", Some(ROOT_ID.into())));
        store.insert_wire(&[], Wire::new("wire-1", "pkg-3", "pkg-2", WireKind::Dependency));
        symlink_merge(&mut store, &[], "pkg-1", "pkg-2", 0);
        assert_eq!(store.wires_at(&[])["wire-1"].kind, WireKind::Symlink);
    }

    #[test]
    fn test_children_reparent_and_relocate_at_root() {
        let mut store = two_lodash_store();
        store.insert_package(&[], Package::new("pkg-3", Some("pkg-2".into())));
        let outcome = symlink_merge(&mut store, &[], "pkg-1", "pkg-2", 0);
        assert_eq!(outcome.relocated, vec!["pkg-3".to_string()]);
        let child = store.package_at(&[], "pkg-3").unwrap();
        assert_eq!(child.parent_id.as_deref(), Some("pkg-1"));
        let winner = store.package_at(&[], "pkg-1").unwrap();
        assert!(winner.children.contains(&"pkg-3".to_string()));
    }

    #[test]
    fn test_combo_reduces_destruction() {
        let mut low = two_lodash_store();
        let mut high = two_lodash_store();
        let at_zero = symlink_merge(&mut low, &[], "pkg-1", "pkg-2", 0);
        let at_five = symlink_merge(&mut high, &[], "pkg-1", "pkg-2", 5);
        assert!(at_five.weight_destroyed < at_zero.weight_destroyed);
    }

    #[test]
    fn test_merge_inside_container_updates_container_size() {
        let mut store = GraphStore::new();
        store.insert_package(
            &[],
            Package::new("pkg-1", Some(ROOT_ID.into())).into_container(),
        );
        let path = vec!["pkg-1".to_string()];
        store.insert_package(
            &path,
            Package::new("pkg-2", Some("pkg-1".into()))
                .with_identity(Identity::new("lodash", "lodash"))
                .with_size(40),
        );
        store.insert_package(
            &path,
            Package::new("pkg-3", Some("pkg-1".into()))
                .with_identity(Identity::new("lodash", "lodash"))
                .with_size(40),
        );
        assert_eq!(store.package_at(&[], "pkg-1").unwrap().size, 80);
        let outcome = symlink_merge(&mut store, &path, "pkg-2", "pkg-3", 0);
        assert!(outcome.merged);
        assert!(outcome.relocated.is_empty());
        assert_eq!(
            store.package_at(&[], "pkg-1").unwrap().size,
            80 - outcome.weight_destroyed
        );
        assert_eq!(store.global_weight(), 80 - outcome.weight_destroyed);
    }
}
