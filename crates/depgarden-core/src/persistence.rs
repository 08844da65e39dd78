//! Save/Load functionality for persisting the nested graph.
//!
//! Uses bincode for the binary save format and serde_json for the debug
//! snapshot export. The arbitrarily-deep nested maps are flattened into
//! scoped records and rebuilt exactly on load — container and ghost flags
//! included — then the id counter is re-derived from the maximum numeric
//! suffix observed across all nested maps so fresh ids never collide.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::engine::EngineStats;
use crate::model::{Identity, InnerGraph, InternalState, Package, PackageState, Wire, WireKind};
use crate::store::GraphStore;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// One package record, addressed by the scope path that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatPackage {
    pub scope: Vec<String>,
    pub id: String,
    pub parent_id: Option<String>,
    pub state: PackageState,
    pub size: u64,
    pub depth: u32,
    pub children: Vec<String>,
    pub identity: Option<Identity>,
    pub is_container: bool,
    pub internal_state: Option<InternalState>,
    pub is_ghost: bool,
    pub ghost_target_id: Option<String>,
    pub ghost_target_scope: Option<String>,
    pub x: f32,
    pub y: f32,
}

/// One wire record, addressed by its owning scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatWire {
    pub scope: Vec<String>,
    pub wire: Wire,
}

/// Serializable snapshot of the full engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    pub sim_time: f64,
    pub time_scale: f32,
    pub shards: u64,
    pub prestige_count: u32,
    pub combo: u32,
    pub last_merge_time: f64,
    pub stats: EngineStats,
    pub global_weight: u64,
    /// Packages in pre-order: every container precedes its contents.
    pub packages: Vec<FlatPackage>,
    pub wires: Vec<FlatWire>,
}

/// Everything a load reconstructs.
pub struct LoadedGraph {
    pub store: GraphStore,
    pub sim_time: f64,
    pub time_scale: f32,
    pub shards: u64,
    pub prestige_count: u32,
    pub combo: u32,
    pub last_merge_time: f64,
    pub stats: EngineStats,
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    Json(serde_json::Error),
    VersionMismatch { expected: u32, found: u32 },
    /// A record's scope path did not resolve to a container during rebuild.
    MissingContainer(String),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(e: serde_json::Error) -> Self {
        SaveError::Json(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::Json(e) => write!(f, "JSON error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::MissingContainer(scope) => {
                write!(f, "Save record references missing container: {}", scope)
            }
        }
    }
}

/// Flatten the nested maps into scoped records, pre-order.
fn flatten(store: &GraphStore) -> (Vec<FlatPackage>, Vec<FlatWire>) {
    fn walk(
        scope: &[String],
        packages: &BTreeMap<String, Package>,
        wires: &BTreeMap<String, Wire>,
        out_packages: &mut Vec<FlatPackage>,
        out_wires: &mut Vec<FlatWire>,
    ) {
        for pkg in packages.values() {
            out_packages.push(FlatPackage {
                scope: scope.to_vec(),
                id: pkg.id.clone(),
                parent_id: pkg.parent_id.clone(),
                state: pkg.state,
                size: pkg.size,
                depth: pkg.depth,
                children: pkg.children.clone(),
                identity: pkg.identity.clone(),
                is_container: pkg.internal.is_some(),
                internal_state: pkg.internal.as_ref().map(|g| g.state),
                is_ghost: pkg.is_ghost,
                ghost_target_id: pkg.ghost_target_id.clone(),
                ghost_target_scope: pkg.ghost_target_scope.clone(),
                x: pkg.x,
                y: pkg.y,
            });
            if let Some(inner) = &pkg.internal {
                let mut child_scope = scope.to_vec();
                child_scope.push(pkg.id.clone());
                walk(&child_scope, &inner.packages, &inner.wires, out_packages, out_wires);
            }
        }
        for wire in wires.values() {
            // Sibling wires are synthetic and never persisted.
            if wire.kind == WireKind::Sibling {
                continue;
            }
            out_wires.push(FlatWire {
                scope: scope.to_vec(),
                wire: wire.clone(),
            });
        }
    }

    let mut out_packages = Vec::new();
    let mut out_wires = Vec::new();
    walk(&[], &store.packages, &store.wires, &mut out_packages, &mut out_wires);
    (out_packages, out_wires)
}

/// Rebuild the nested maps from flat records.
fn rebuild(data: &SaveData) -> Result<GraphStore, SaveError> {
    let mut store = GraphStore {
        packages: BTreeMap::new(),
        wires: BTreeMap::new(),
        next_id: 1,
        global_weight: data.global_weight,
    };
    for record in &data.packages {
        let pkg = Package {
            id: record.id.clone(),
            parent_id: record.parent_id.clone(),
            state: record.state,
            size: record.size,
            depth: record.depth,
            children: record.children.clone(),
            identity: record.identity.clone(),
            internal: if record.is_container {
                Some(InnerGraph {
                    packages: BTreeMap::new(),
                    wires: BTreeMap::new(),
                    state: record.internal_state.unwrap_or_default(),
                })
            } else {
                None
            },
            is_ghost: record.is_ghost,
            ghost_target_id: record.ghost_target_id.clone(),
            ghost_target_scope: record.ghost_target_scope.clone(),
            x: record.x,
            y: record.y,
        };
        let (packages, _) = store
            .scope_maps_mut(&record.scope)
            .ok_or_else(|| SaveError::MissingContainer(record.scope.join("/")))?;
        packages.insert(pkg.id.clone(), pkg);
    }
    for record in &data.wires {
        let (_, wires) = store
            .scope_maps_mut(&record.scope)
            .ok_or_else(|| SaveError::MissingContainer(record.scope.join("/")))?;
        wires.insert(record.wire.id.clone(), record.wire.clone());
    }
    store.recompute_next_id();
    Ok(store)
}

#[allow(clippy::too_many_arguments)]
fn snapshot(
    store: &GraphStore,
    sim_time: f64,
    time_scale: f32,
    shards: u64,
    prestige_count: u32,
    combo: u32,
    last_merge_time: f64,
    stats: EngineStats,
) -> SaveData {
    let (packages, wires) = flatten(store);
    SaveData {
        version: SAVE_VERSION,
        sim_time,
        time_scale,
        shards,
        prestige_count,
        combo,
        last_merge_time,
        stats,
        global_weight: store.global_weight(),
        packages,
        wires,
    }
}

fn finish_load(data: SaveData) -> Result<LoadedGraph, SaveError> {
    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }
    let store = rebuild(&data)?;
    Ok(LoadedGraph {
        store,
        sim_time: data.sim_time,
        time_scale: data.time_scale,
        shards: data.shards,
        prestige_count: data.prestige_count,
        combo: data.combo,
        last_merge_time: data.last_merge_time,
        stats: data.stats,
    })
}

/// Save the graph and counters to a writer (binary).
#[allow(clippy::too_many_arguments)]
pub fn save_graph<W: Write>(
    writer: W,
    store: &GraphStore,
    sim_time: f64,
    time_scale: f32,
    shards: u64,
    prestige_count: u32,
    combo: u32,
    last_merge_time: f64,
    stats: EngineStats,
) -> Result<(), SaveError> {
    let data = snapshot(
        store,
        sim_time,
        time_scale,
        shards,
        prestige_count,
        combo,
        last_merge_time,
        stats,
    );
    bincode::serialize_into(writer, &data)?;
    Ok(())
}

/// Load a graph from a reader (binary).
pub fn load_graph<R: Read>(reader: R) -> Result<LoadedGraph, SaveError> {
    let data: SaveData = bincode::deserialize_from(reader)?;
    finish_load(data)
}

/// JSON snapshot for external tooling.
#[allow(clippy::too_many_arguments)]
pub fn export_json(
    store: &GraphStore,
    sim_time: f64,
    time_scale: f32,
    shards: u64,
    prestige_count: u32,
    combo: u32,
    last_merge_time: f64,
    stats: EngineStats,
) -> Result<String, SaveError> {
    let data = snapshot(
        store,
        sim_time,
        time_scale,
        shards,
        prestige_count,
        combo,
        last_merge_time,
        stats,
    );
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Rebuild a graph from a JSON snapshot.
pub fn import_json(json: &str) -> Result<LoadedGraph, SaveError> {
    let data: SaveData = serde_json::from_str(json)?;
    finish_load(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identity, ROOT_ID};

    fn build_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.insert_package(
            &[],
            Package::new("pkg-1", Some(ROOT_ID.into())).into_container(),
        );
        let p1 = vec!["pkg-1".to_string()];
        store.insert_package(
            &p1,
            Package::new("pkg-2", Some("pkg-1".into())).into_container(),
        );
        let p2 = vec!["pkg-1".to_string(), "pkg-2".to_string()];
        let mut ghost = Package::new("pkg-3", Some("pkg-2".into()))
            .with_identity(Identity::new("lodash", "Lodash"));
        ghost.is_ghost = true;
        ghost.ghost_target_id = Some("pkg-9".into());
        ghost.ghost_target_scope = Some("pkg-8".into());
        store.insert_package(&p2, ghost);
        store.insert_package(
            &p2,
            Package::new("pkg-4", Some("pkg-2".into()))
                .with_identity(Identity::new("moment", "Moment"))
                .with_size(12),
        );
        store.insert_wire(
            &p2,
            Wire::new("wire-5", "pkg-3", "pkg-4", WireKind::Dependency),
        );
        store
    }

    fn roundtrip(store: &GraphStore) -> LoadedGraph {
        let mut buf = Vec::new();
        save_graph(&mut buf, store, 7.5, 2.0, 300, 1, 2, 6.0, EngineStats::default()).unwrap();
        load_graph(buf.as_slice()).unwrap()
    }

    #[test]
    fn test_nested_roundtrip_is_exact() {
        let store = build_store();
        let loaded = roundtrip(&store);
        let p2 = vec!["pkg-1".to_string(), "pkg-2".to_string()];

        assert_eq!(loaded.store.global_weight(), store.global_weight());
        assert_eq!(loaded.store.package_count(), store.package_count());
        let ghost = loaded.store.package_at(&p2, "pkg-3").unwrap();
        assert!(ghost.is_ghost);
        assert_eq!(ghost.ghost_target_id.as_deref(), Some("pkg-9"));
        assert_eq!(ghost.ghost_target_scope.as_deref(), Some("pkg-8"));
        let wire = &loaded.store.wires_at(&p2)["wire-5"];
        assert_eq!(wire.to_id, "pkg-4");
        // Container flags survive, including empty nested graphs.
        assert!(loaded.store.package_at(&p2, "pkg-4").map(|p| !p.is_container()).unwrap());
        assert!(loaded
            .store
            .package_at(&[], "pkg-1")
            .unwrap()
            .is_container());
        assert_eq!(loaded.sim_time, 7.5);
        assert_eq!(loaded.shards, 300);
        assert_eq!(loaded.combo, 2);
    }

    #[test]
    fn test_id_counter_rederived_from_max_suffix() {
        let store = build_store();
        let mut loaded = roundtrip(&store);
        // Highest suffix in the save is wire-5.
        assert_eq!(loaded.store.alloc_package_id(), "pkg-6");
    }

    #[test]
    fn test_version_mismatch_detected() {
        let store = build_store();
        let mut data = snapshot(&store, 0.0, 1.0, 0, 0, 0, 0.0, EngineStats::default());
        data.version = 99;
        let mut buf = Vec::new();
        bincode::serialize_into(&mut buf, &data).unwrap();
        match load_graph(buf.as_slice()) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected version mismatch, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let store = build_store();
        let json = export_json(&store, 1.0, 1.0, 50, 0, 0, 0.0, EngineStats::default()).unwrap();
        let loaded = import_json(&json).unwrap();
        assert_eq!(loaded.store.package_count(), store.package_count());
        assert_eq!(loaded.shards, 50);
    }

    #[test]
    fn test_truncated_save_is_an_error() {
        let store = build_store();
        let mut buf = Vec::new();
        save_graph(&mut buf, &store, 0.0, 1.0, 0, 0, 0, 0.0, EngineStats::default()).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(load_graph(buf.as_slice()).is_err());
    }
}
