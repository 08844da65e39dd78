//! Graph store — root-level arenas plus path-addressed nested graphs.
//!
//! The store owns every package and wire in the game. Nesting is an
//! explicit tree of id-keyed maps: a container package carries its own
//! package/wire arenas, addressed by a scope path (ordered list of
//! container ids, `[]` meaning root). All lookups walk the path step by
//! step — there are no references across graph boundaries.
//!
//! Maps are `BTreeMap` so iteration order is deterministic: discovery-order
//! coloring and first-encountered tie-breaks are reproducible run to run.
//!
//! Weight accounting lives here: inserting or removing a package adjusts
//! the global weight total and the size of every enclosing container along
//! the path. Mutations that destroy weight go through the same helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Package, Wire, ROOT_ID};

static EMPTY_PACKAGES: BTreeMap<String, Package> = BTreeMap::new();
static EMPTY_WIRES: BTreeMap<String, Wire> = BTreeMap::new();

/// Owns the nested package/wire arenas and the aggregate weight counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStore {
    pub(crate) packages: BTreeMap<String, Package>,
    pub(crate) wires: BTreeMap<String, Wire>,
    pub(crate) next_id: u64,
    pub(crate) global_weight: u64,
}

impl GraphStore {
    /// An empty store holding only the synthetic root node.
    pub fn new() -> Self {
        let mut packages = BTreeMap::new();
        packages.insert(ROOT_ID.to_string(), Package::root());
        Self {
            packages,
            wires: BTreeMap::new(),
            next_id: 1,
            global_weight: 0,
        }
    }

    // ── Id allocation ───────────────────────────────────────────────────

    pub fn alloc_package_id(&mut self) -> String {
        let n = self.next_id;
        self.next_id += 1;
        format!("pkg-{}", n)
    }

    pub fn alloc_wire_id(&mut self) -> String {
        let n = self.next_id;
        self.next_id += 1;
        format!("wire-{}", n)
    }

    /// Re-derive the id counter from the maximum numeric suffix observed
    /// across all nested maps. Called after a load so fresh ids never
    /// collide with persisted ones.
    pub fn recompute_next_id(&mut self) {
        fn bump(id: &str, max: &mut u64) {
            if let Some(suffix) = id.rsplit('-').next() {
                if let Ok(n) = suffix.parse::<u64>() {
                    if n > *max {
                        *max = n;
                    }
                }
            }
        }
        fn scan(packages: &BTreeMap<String, Package>, wires: &BTreeMap<String, Wire>, max: &mut u64) {
            for (id, pkg) in packages {
                bump(id, max);
                if let Some(inner) = &pkg.internal {
                    scan(&inner.packages, &inner.wires, max);
                }
            }
            for id in wires.keys() {
                bump(id, max);
            }
        }
        let mut max = 0;
        scan(&self.packages, &self.wires, &mut max);
        self.next_id = max + 1;
    }

    // ── Path resolution ─────────────────────────────────────────────────

    /// Resolve a scope path to its container package. The empty path
    /// resolves to the synthetic root; every element must name a container
    /// in the previous step's graph.
    pub fn resolve(&self, path: &[String]) -> Option<&Package> {
        if path.is_empty() {
            return self.packages.get(ROOT_ID);
        }
        let (first, rest) = path.split_first()?;
        let mut node = self.packages.get(first)?;
        if node.internal.is_none() {
            return None;
        }
        for step in rest {
            node = node.internal.as_ref()?.packages.get(step)?;
            if node.internal.is_none() {
                return None;
            }
        }
        Some(node)
    }

    pub fn resolve_mut(&mut self, path: &[String]) -> Option<&mut Package> {
        if path.is_empty() {
            return self.packages.get_mut(ROOT_ID);
        }
        let (first, rest) = path.split_first()?;
        let mut node = self.packages.get_mut(first)?;
        if node.internal.is_none() {
            return None;
        }
        for step in rest {
            node = node.internal.as_mut()?.packages.get_mut(step)?;
            if node.internal.is_none() {
                return None;
            }
        }
        Some(node)
    }

    /// Package map of the graph at a path. Empty mapping if resolution
    /// fails — callers treat stale paths as an empty scope, not an error.
    pub fn packages_at(&self, path: &[String]) -> &BTreeMap<String, Package> {
        if path.is_empty() {
            return &self.packages;
        }
        self.resolve(path)
            .and_then(|p| p.internal.as_ref())
            .map(|g| &g.packages)
            .unwrap_or(&EMPTY_PACKAGES)
    }

    /// Wire map of the graph at a path.
    pub fn wires_at(&self, path: &[String]) -> &BTreeMap<String, Wire> {
        if path.is_empty() {
            return &self.wires;
        }
        self.resolve(path)
            .and_then(|p| p.internal.as_ref())
            .map(|g| &g.wires)
            .unwrap_or(&EMPTY_WIRES)
    }

    /// Mutable package and wire maps of the graph at a path.
    pub(crate) fn scope_maps_mut(
        &mut self,
        path: &[String],
    ) -> Option<(&mut BTreeMap<String, Package>, &mut BTreeMap<String, Wire>)> {
        if path.is_empty() {
            return Some((&mut self.packages, &mut self.wires));
        }
        let node = self.resolve_mut(path)?;
        node.internal
            .as_mut()
            .map(|g| (&mut g.packages, &mut g.wires))
    }

    /// Look up one package by scope path and id.
    pub fn package_at<'a>(&'a self, path: &[String], id: &str) -> Option<&'a Package> {
        self.packages_at(path).get(id)
    }

    pub(crate) fn package_at_mut<'a>(
        &'a mut self,
        path: &[String],
        id: &str,
    ) -> Option<&'a mut Package> {
        let (packages, _) = self.scope_maps_mut(path)?;
        packages.get_mut(id)
    }

    /// First non-ghost, identity-bearing package with the given name in a
    /// scope.
    pub fn find_by_name<'a>(&'a self, path: &[String], name: &str) -> Option<&'a Package> {
        self.packages_at(path)
            .values()
            .find(|p| p.groupable() && p.name() == Some(name))
    }

    /// Top-level containers, in id order.
    pub fn top_level_containers(&self) -> impl Iterator<Item = &Package> {
        self.packages.values().filter(|p| p.is_container())
    }

    /// Resolve a ghost's target as an (owning scope, id) lookup. Returns
    /// `None` for non-ghosts, for targets that vanished, and for targets
    /// that are themselves ghosts — never panics.
    pub fn ghost_target<'a>(&'a self, ghost: &Package) -> Option<&'a Package> {
        if !ghost.is_ghost {
            return None;
        }
        let scope = vec![ghost.ghost_target_scope.clone()?];
        let target_id = ghost.ghost_target_id.as_deref()?;
        self.package_at(&scope, target_id).filter(|p| !p.is_ghost)
    }

    // ── Structural mutation (spawner- and engine-facing) ────────────────

    /// Insert a package into the graph at a path. Returns false (no state
    /// change) if the path does not resolve or the id is taken. Updates the
    /// global weight and every enclosing container's size.
    pub fn insert_package(&mut self, path: &[String], pkg: Package) -> bool {
        // Ghosts are never containers; in release this is simply stored as
        // given, analyzers skip ghosts anyway.
        debug_assert!(
            !(pkg.is_ghost && pkg.internal.is_some()),
            "ghost packages cannot carry a nested graph"
        );
        let size = pkg.size;
        let id = pkg.id.clone();
        let parent = pkg.parent_id.clone();
        {
            let (packages, _) = match self.scope_maps_mut(path) {
                Some(maps) => maps,
                None => return false,
            };
            if packages.contains_key(&id) {
                return false;
            }
            if let Some(parent_id) = &parent {
                if let Some(parent_pkg) = packages.get_mut(parent_id) {
                    if !parent_pkg.children.contains(&id) {
                        parent_pkg.children.push(id.clone());
                    }
                }
            }
            packages.insert(id, pkg);
        }
        self.global_weight += size;
        self.add_container_sizes(path, size);
        true
    }

    /// Insert a wire into the graph at a path. Rejects self-loops, missing
    /// endpoints, duplicate `(from, to)` pairs, and taken ids.
    pub fn insert_wire(&mut self, path: &[String], wire: Wire) -> bool {
        let (packages, wires) = match self.scope_maps_mut(path) {
            Some(maps) => maps,
            None => return false,
        };
        if wire.from_id == wire.to_id
            || wires.contains_key(&wire.id)
            || !packages.contains_key(&wire.from_id)
            || !packages.contains_key(&wire.to_id)
        {
            return false;
        }
        let duplicate = wires
            .values()
            .any(|w| w.from_id == wire.from_id && w.to_id == wire.to_id);
        if duplicate {
            return false;
        }
        wires.insert(wire.id.clone(), wire);
        true
    }

    /// Remove a package, its touching wires, and its weight. The removed
    /// node's children are reparented to its parent. The synthetic root
    /// cannot be removed.
    pub fn remove_package(&mut self, path: &[String], id: &str) -> Option<Package> {
        if path.is_empty() && id == ROOT_ID {
            return None;
        }
        let removed;
        {
            let (packages, wires) = self.scope_maps_mut(path)?;
            removed = packages.remove(id)?;
            wires.retain(|_, w| !w.touches(id));
            if let Some(parent_id) = &removed.parent_id {
                if let Some(parent) = packages.get_mut(parent_id) {
                    parent.children.retain(|c| c != id);
                }
            }
            for child_id in &removed.children {
                if let Some(child) = packages.get_mut(child_id) {
                    child.parent_id = removed.parent_id.clone();
                }
            }
            if let Some(parent_id) = &removed.parent_id {
                let orphans: Vec<String> = removed
                    .children
                    .iter()
                    .filter(|c| packages.contains_key(*c))
                    .cloned()
                    .collect();
                if let Some(parent) = packages.get_mut(parent_id) {
                    for orphan in orphans {
                        if !parent.children.contains(&orphan) {
                            parent.children.push(orphan);
                        }
                    }
                }
            }
        }
        self.global_weight = self.global_weight.saturating_sub(removed.size);
        self.sub_container_sizes(path, removed.size);
        Some(removed)
    }

    /// Remove a wire. Returns the wire if it existed.
    pub fn remove_wire(&mut self, path: &[String], wire_id: &str) -> Option<Wire> {
        let (_, wires) = self.scope_maps_mut(path)?;
        wires.remove(wire_id)
    }

    // ── Weight accounting ───────────────────────────────────────────────

    pub fn global_weight(&self) -> u64 {
        self.global_weight
    }

    pub(crate) fn debit_weight(&mut self, amount: u64) {
        self.global_weight = self.global_weight.saturating_sub(amount);
    }

    /// Add to the size of every container along a path.
    pub(crate) fn add_container_sizes(&mut self, path: &[String], amount: u64) {
        if amount == 0 {
            return;
        }
        for end in 1..=path.len() {
            if let Some(container) = self.resolve_mut(&path[..end]) {
                if !container.is_root() {
                    container.size += amount;
                }
            }
        }
    }

    /// Subtract from the size of every container along a path.
    pub(crate) fn sub_container_sizes(&mut self, path: &[String], amount: u64) {
        if amount == 0 {
            return;
        }
        for end in 1..=path.len() {
            if let Some(container) = self.resolve_mut(&path[..end]) {
                if !container.is_root() {
                    container.size = container.size.saturating_sub(amount);
                }
            }
        }
    }

    // ── Counting ────────────────────────────────────────────────────────

    /// Total packages across every nested graph, synthetic root included.
    pub fn package_count(&self) -> usize {
        fn count(packages: &BTreeMap<String, Package>) -> usize {
            packages
                .values()
                .map(|p| {
                    1 + p
                        .internal
                        .as_ref()
                        .map(|g| count(&g.packages))
                        .unwrap_or(0)
                })
                .sum()
        }
        count(&self.packages)
    }

    /// Total wires across every nested graph.
    pub fn wire_count(&self) -> usize {
        fn count(packages: &BTreeMap<String, Package>, wires: &BTreeMap<String, Wire>) -> usize {
            wires.len()
                + packages
                    .values()
                    .filter_map(|p| p.internal.as_ref())
                    .map(|g| count(&g.packages, &g.wires))
                    .sum::<usize>()
        }
        count(&self.packages, &self.wires)
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
