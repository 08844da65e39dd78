//! Intra-scope analysis — duplicate groups and wire conflicts for the
//! graph the navigator currently exposes.
//!
//! Duplicate grouping partitions non-ghost, identity-bearing packages by
//! name. Conflict detection is lazy: incompatibility is realized only along
//! existing structural edges at this level — unwired incompatible pairs are
//! not invented here (cross-container incompatibility is the cross-package
//! analyzer's job).

use std::collections::{BTreeMap, HashMap};

use depgarden_logic::palette;
use depgarden_logic::registry::IdentityRegistry;

use crate::model::{Package, Wire, WireKind};

/// One group of same-named packages in the current scope.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub name: String,
    /// Display color, assigned in discovery order within one pass.
    pub color: &'static str,
    pub package_ids: Vec<String>,
}

/// Result of one intra-scope analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeAnalysis {
    /// Generation counter at the time of the pass.
    pub generation: u64,
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Ids of wires currently marked conflicted in this scope.
    pub conflicted_wires: Vec<String>,
}

impl ScopeAnalysis {
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            duplicate_groups: Vec::new(),
            conflicted_wires: Vec::new(),
        }
    }

    /// Whether the scope holds any unresolved duplicates or conflicts.
    pub fn has_issues(&self) -> bool {
        !self.duplicate_groups.is_empty() || !self.conflicted_wires.is_empty()
    }

    /// The duplicate group a package belongs to, if any.
    pub fn group_for(&self, package_id: &str) -> Option<&DuplicateGroup> {
        self.duplicate_groups
            .iter()
            .find(|g| g.package_ids.iter().any(|id| id == package_id))
    }

    pub fn is_duplicate(&self, package_id: &str) -> bool {
        self.group_for(package_id).is_some()
    }

    pub fn is_conflicted_wire(&self, wire_id: &str) -> bool {
        self.conflicted_wires.iter().any(|id| id == wire_id)
    }
}

/// Partition a scope's packages into same-name groups of size >= 2, in
/// discovery order. At root scope the synthetic root is excluded, and so
/// are containers — those belong to cross-package detection.
pub(crate) fn duplicate_groups_in(
    packages: &BTreeMap<String, Package>,
    at_root: bool,
) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut members: HashMap<String, Vec<String>> = HashMap::new();

    for pkg in packages.values() {
        if !pkg.groupable() {
            continue;
        }
        if at_root && (pkg.is_root() || pkg.is_container()) {
            continue;
        }
        let name = match pkg.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !members.contains_key(&name) {
            order.push(name.clone());
        }
        members.entry(name).or_default().push(pkg.id.clone());
    }

    order
        .into_iter()
        .filter_map(|name| {
            let ids = members.remove(&name)?;
            if ids.len() >= 2 {
                Some((name, ids))
            } else {
                None
            }
        })
        .collect()
}

/// Run one analysis pass over a scope's maps. Marks and clears wire
/// conflict flags in place, then reports the derived sets.
pub fn analyze_scope(
    packages: &BTreeMap<String, Package>,
    wires: &mut BTreeMap<String, Wire>,
    registry: &IdentityRegistry,
    at_root: bool,
    now: f64,
    generation: u64,
) -> ScopeAnalysis {
    let duplicate_groups = duplicate_groups_in(packages, at_root)
        .into_iter()
        .enumerate()
        .map(|(i, (name, package_ids))| DuplicateGroup {
            name,
            color: palette::duplicate_color(i),
            package_ids,
        })
        .collect();

    let mut conflicted_wires = Vec::new();
    for wire in wires.values_mut() {
        if wire.kind == WireKind::Sibling {
            continue;
        }
        let incompatible = match (packages.get(&wire.from_id), packages.get(&wire.to_id)) {
            (Some(a), Some(b)) if !a.is_ghost && !b.is_ghost => match (a.name(), b.name()) {
                (Some(na), Some(nb)) => registry.incompatible(na, nb),
                _ => false,
            },
            _ => false,
        };
        if incompatible {
            wire.mark_conflicted(now);
            conflicted_wires.push(wire.id.clone());
        } else {
            wire.clear_conflict();
        }
    }

    ScopeAnalysis {
        generation,
        duplicate_groups,
        conflicted_wires,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identity, ROOT_ID};
    use depgarden_logic::registry::{IdentityMeta, RegistryData};

    fn registry() -> IdentityRegistry {
        IdentityRegistry::from_data(RegistryData {
            identities: vec![
                IdentityMeta {
                    name: "moment".into(),
                    label: "Moment".into(),
                    category: "datetime".into(),
                },
                IdentityMeta {
                    name: "date-fns".into(),
                    label: "date-fns".into(),
                    category: "datetime".into(),
                },
            ],
            incompatible: vec![("moment".into(), "date-fns".into())],
        })
    }

    fn named(id: &str, name: &str) -> Package {
        Package::new(id, Some(ROOT_ID.into())).with_identity(Identity::new(name, name))
    }

    fn scope_with(pkgs: Vec<Package>) -> BTreeMap<String, Package> {
        let mut map = BTreeMap::new();
        map.insert(ROOT_ID.to_string(), Package::root());
        for p in pkgs {
            map.insert(p.id.clone(), p);
        }
        map
    }

    #[test]
    fn test_duplicate_grouping_by_name() {
        let packages = scope_with(vec![
            named("pkg-1", "lodash"),
            named("pkg-2", "lodash"),
            named("pkg-3", "moment"),
        ]);
        let groups = duplicate_groups_in(&packages, true);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "lodash");
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_ghosts_excluded_from_grouping() {
        let mut ghost = named("pkg-1", "lodash");
        ghost.is_ghost = true;
        let packages = scope_with(vec![ghost, named("pkg-2", "lodash")]);
        assert!(duplicate_groups_in(&packages, true).is_empty());
    }

    #[test]
    fn test_containers_excluded_at_root_only() {
        let container = named("pkg-1", "lodash").into_container();
        let packages = scope_with(vec![container, named("pkg-2", "lodash")]);
        assert!(duplicate_groups_in(&packages, true).is_empty());
        // Inside a container scope, containers group normally.
        assert_eq!(duplicate_groups_in(&packages, false).len(), 1);
    }

    #[test]
    fn test_group_colors_cycle_in_discovery_order() {
        let packages = scope_with(vec![
            named("pkg-1", "lodash"),
            named("pkg-2", "lodash"),
            named("pkg-3", "moment"),
            named("pkg-4", "moment"),
        ]);
        let mut wires = BTreeMap::new();
        let analysis = analyze_scope(&packages, &mut wires, &registry(), true, 0.0, 0);
        assert_eq!(analysis.duplicate_groups.len(), 2);
        assert_ne!(
            analysis.duplicate_groups[0].color,
            analysis.duplicate_groups[1].color
        );
    }

    #[test]
    fn test_conflict_marked_only_along_wires() {
        let packages = scope_with(vec![named("pkg-1", "moment"), named("pkg-2", "date-fns")]);
        let mut wires = BTreeMap::new();
        // No wire yet: no conflict is invented.
        let analysis = analyze_scope(&packages, &mut wires, &registry(), true, 1.0, 0);
        assert!(analysis.conflicted_wires.is_empty());

        wires.insert(
            "wire-1".to_string(),
            Wire::new("wire-1", "pkg-1", "pkg-2", WireKind::Dependency),
        );
        let analysis = analyze_scope(&packages, &mut wires, &registry(), true, 2.0, 1);
        assert_eq!(analysis.conflicted_wires, vec!["wire-1".to_string()]);
        assert_eq!(wires["wire-1"].conflict_time, Some(2.0));
    }

    #[test]
    fn test_conflict_cleared_when_pair_resolves() {
        let mut packages = scope_with(vec![named("pkg-1", "moment"), named("pkg-2", "date-fns")]);
        let mut wires = BTreeMap::new();
        wires.insert(
            "wire-1".to_string(),
            Wire::new("wire-1", "pkg-1", "pkg-2", WireKind::Dependency),
        );
        analyze_scope(&packages, &mut wires, &registry(), true, 1.0, 0);
        assert!(wires["wire-1"].conflicted);

        // Upgrade one side: the pair is no longer incompatible.
        packages.get_mut("pkg-2").unwrap().identity = Some(Identity::new("moment", "Moment"));
        let analysis = analyze_scope(&packages, &mut wires, &registry(), true, 2.0, 1);
        assert!(!wires["wire-1"].conflicted);
        assert!(analysis.conflicted_wires.is_empty());
    }

    #[test]
    fn test_ghost_endpoint_never_conflicts() {
        let mut ghost = named("pkg-1", "moment");
        ghost.is_ghost = true;
        let packages = scope_with(vec![ghost, named("pkg-2", "date-fns")]);
        let mut wires = BTreeMap::new();
        wires.insert(
            "wire-1".to_string(),
            Wire::new("wire-1", "pkg-1", "pkg-2", WireKind::Dependency),
        );
        let analysis = analyze_scope(&packages, &mut wires, &registry(), true, 1.0, 0);
        assert!(analysis.conflicted_wires.is_empty());
        assert!(!wires["wire-1"].conflicted);
    }

    #[test]
    fn test_group_lookup_helpers() {
        let packages = scope_with(vec![named("pkg-1", "lodash"), named("pkg-2", "lodash")]);
        let mut wires = BTreeMap::new();
        let analysis = analyze_scope(&packages, &mut wires, &registry(), true, 0.0, 3);
        assert!(analysis.is_duplicate("pkg-1"));
        assert!(!analysis.is_duplicate(ROOT_ID));
        assert_eq!(analysis.group_for("pkg-2").unwrap().name, "lodash");
        assert_eq!(analysis.generation, 3);
        assert!(analysis.has_issues());
    }
}
