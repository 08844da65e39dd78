//! Cross-package analysis — duplicate and conflict relationships between
//! top-level containers, computed without entering scope.
//!
//! Every pass is a full recomputation: nodes marked conflicted by the
//! previous pass but no longer implicated are cleared back to `Ready`, by
//! diffing the previous pass's marked set against the new one. Hoisted
//! names are re-suppressed on every pass for the same reason — there is no
//! incremental patching to go stale.

use std::collections::{BTreeMap, BTreeSet};

use depgarden_logic::palette;
use depgarden_logic::registry::IdentityRegistry;

use crate::model::{PackageState, Wire, WireKind};
use crate::store::GraphStore;

/// External hoisting subsystem, query only. Names already hoisted to the
/// root ring are skipped by duplicate detection.
pub trait HoistLookup {
    fn is_hoisted(&self, name: &str) -> bool;
}

/// Default lookup: nothing is hoisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHoists;

impl HoistLookup for NoHoists {
    fn is_hoisted(&self, _name: &str) -> bool {
        false
    }
}

/// A duplicate relationship between two top-level containers.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossDuplicate {
    pub a_id: String,
    pub b_id: String,
    pub name: String,
    /// One shared color per distinct name, so all pairs sharing a name
    /// render consistently.
    pub color: &'static str,
}

/// Result of one cross-package analysis pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrossAnalysis {
    pub duplicates: Vec<CrossDuplicate>,
    /// Synthetic root-scope edges between conflicting container pairs.
    /// Not part of the structural graph; recomputed every pass.
    pub sibling_wires: Vec<Wire>,
}

impl CrossAnalysis {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a top-level container is part of any duplicate or conflict
    /// relationship.
    pub fn involves(&self, container_id: &str) -> bool {
        self.duplicates
            .iter()
            .any(|d| d.a_id == container_id || d.b_id == container_id)
            || self
                .sibling_wires
                .iter()
                .any(|w| w.touches(container_id))
    }

    /// Distinct duplicated names, in color-assignment order.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for dup in &self.duplicates {
            if !names.contains(&dup.name.as_str()) {
                names.push(dup.name.as_str());
            }
        }
        names
    }
}

/// Recomputes cross-package relationships and owns the previous pass's
/// marked sets for diff-based clearing.
#[derive(Debug, Clone, Default)]
pub struct CrossPackageAnalyzer {
    /// `(container id, inner node id)` marked conflicted last pass.
    prev_nodes: BTreeSet<(String, String)>,
    /// `(container id, wire id)` marked conflicted last pass.
    prev_wires: BTreeSet<(String, String)>,
    /// First-seen time per conflicting container pair, so sibling wires
    /// keep a stable conflict timestamp across passes.
    sibling_since: BTreeMap<(String, String), f64>,
}

impl CrossPackageAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one full pass over every top-level container's nested graph.
    pub fn analyze(
        &mut self,
        store: &mut GraphStore,
        registry: &IdentityRegistry,
        hoists: &dyn HoistLookup,
        now: f64,
    ) -> CrossAnalysis {
        // Snapshot: per container, the non-ghost identity-bearing inner
        // nodes as (name, node id) pairs.
        let mut containers: Vec<(String, Vec<(String, String)>)> = Vec::new();
        for pkg in store.packages.values() {
            let inner = match &pkg.internal {
                Some(g) => g,
                None => continue,
            };
            let names: Vec<(String, String)> = inner
                .packages
                .values()
                .filter(|n| n.groupable())
                .filter_map(|n| n.name().map(|name| (name.to_string(), n.id.clone())))
                .collect();
            containers.push((pkg.id.clone(), names));
        }

        // Duplicates: shared names per pair, hoisted names suppressed.
        let mut color_order: Vec<String> = Vec::new();
        let mut duplicates = Vec::new();
        for i in 0..containers.len() {
            for j in i + 1..containers.len() {
                let (a_id, a_names) = &containers[i];
                let (b_id, b_names) = &containers[j];
                let b_set: BTreeSet<&str> = b_names.iter().map(|(n, _)| n.as_str()).collect();
                let mut seen: BTreeSet<&str> = BTreeSet::new();
                for (name, _) in a_names {
                    if !b_set.contains(name.as_str()) || hoists.is_hoisted(name) {
                        continue;
                    }
                    if !seen.insert(name.as_str()) {
                        continue;
                    }
                    let idx = match color_order.iter().position(|n| n == name) {
                        Some(idx) => idx,
                        None => {
                            color_order.push(name.clone());
                            color_order.len() - 1
                        }
                    };
                    duplicates.push(CrossDuplicate {
                        a_id: a_id.clone(),
                        b_id: b_id.clone(),
                        name: name.clone(),
                        color: palette::cross_color(idx),
                    });
                }
            }
        }

        // Conflicts: registry-incompatible name pairs across containers.
        let mut marked_nodes: BTreeSet<(String, String)> = BTreeSet::new();
        let mut conflict_pairs: BTreeSet<(String, String)> = BTreeSet::new();
        for i in 0..containers.len() {
            for j in i + 1..containers.len() {
                let (a_id, a_names) = &containers[i];
                let (b_id, b_names) = &containers[j];
                for (n1, id1) in a_names {
                    for (n2, id2) in b_names {
                        if registry.incompatible(n1, n2) {
                            marked_nodes.insert((a_id.clone(), id1.clone()));
                            marked_nodes.insert((b_id.clone(), id2.clone()));
                            conflict_pairs.insert((a_id.clone(), b_id.clone()));
                        }
                    }
                }
            }
        }

        // Apply marks to inner nodes and the wires feeding them.
        let mut marked_wires: BTreeSet<(String, String)> = BTreeSet::new();
        for (container_id, node_id) in &marked_nodes {
            let inner = match store
                .packages
                .get_mut(container_id)
                .and_then(|p| p.internal.as_mut())
            {
                Some(inner) => inner,
                None => continue,
            };
            if let Some(node) = inner.packages.get_mut(node_id) {
                node.state = PackageState::Conflict;
            }
            for wire in inner.wires.values_mut() {
                if wire.to_id == *node_id {
                    wire.mark_conflicted(now);
                    marked_wires.insert((container_id.clone(), wire.id.clone()));
                }
            }
        }

        // Diff against the previous pass: clear stale conflict state.
        for (container_id, node_id) in self.prev_nodes.difference(&marked_nodes) {
            if let Some(inner) = store
                .packages
                .get_mut(container_id)
                .and_then(|p| p.internal.as_mut())
            {
                if let Some(node) = inner.packages.get_mut(node_id) {
                    if node.state == PackageState::Conflict {
                        node.state = PackageState::Ready;
                    }
                }
            }
        }
        for (container_id, wire_id) in self.prev_wires.difference(&marked_wires) {
            if let Some(inner) = store
                .packages
                .get_mut(container_id)
                .and_then(|p| p.internal.as_mut())
            {
                if let Some(wire) = inner.wires.get_mut(wire_id) {
                    wire.clear_conflict();
                }
            }
        }

        // Sibling wires, with first-seen timestamps held stable.
        let mut sibling_wires = Vec::new();
        let mut next_times = BTreeMap::new();
        for pair in &conflict_pairs {
            let since = *self.sibling_since.get(pair).unwrap_or(&now);
            next_times.insert(pair.clone(), since);
            let (a, b) = pair;
            let mut wire = Wire::new(format!("sib-{}-{}", a, b), a.clone(), b.clone(), WireKind::Sibling);
            wire.conflicted = true;
            wire.conflict_time = Some(since);
            sibling_wires.push(wire);
        }

        self.sibling_since = next_times;
        self.prev_nodes = marked_nodes;
        self.prev_wires = marked_wires;

        CrossAnalysis {
            duplicates,
            sibling_wires,
        }
    }
}
