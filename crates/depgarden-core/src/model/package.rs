//! Package nodes and their optional nested graphs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::wire::Wire;

/// Id of the synthetic root node present at root scope.
pub const ROOT_ID: &str = "root";

/// Animation/interaction state of a package. Not structural — analyzers and
/// mutations rewrite it freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageState {
    /// Just spawned, still flying into place.
    Installing,
    /// Settled, no outstanding issues.
    Ready,
    /// Flagged by an analyzer as part of an incompatible pair.
    Conflict,
    /// Merged or ghosted — counts toward the optimized total.
    Optimized,
}

/// Evaluation state of a container's nested graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternalState {
    /// Never entered or evaluated.
    Pristine,
    /// Evaluated and found to hold unresolved conflicts or duplicates.
    Unstable,
    /// Evaluated clean.
    Stable,
}

impl Default for InternalState {
    fn default() -> Self {
        InternalState::Pristine
    }
}

/// Name-based equivalence key plus display metadata. Packages without an
/// identity cannot duplicate or conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub label: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

/// A container's nested graph — its own package and wire arenas plus the
/// evaluation state of that scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InnerGraph {
    pub packages: BTreeMap<String, Package>,
    pub wires: BTreeMap<String, Wire>,
    pub state: InternalState,
}

impl InnerGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A node in the dependency graph. A package is a *container* iff
/// `internal` is present — including an empty nested graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Globally unique, stable for the node's lifetime.
    pub id: String,
    /// Owning node's id within the same graph; `None` only for the root.
    pub parent_id: Option<String>,
    pub state: PackageState,
    /// Weight contribution. Aggregate counters are not derived from this —
    /// the store keeps them consistent on every size change.
    pub size: u64,
    /// Distance from the scope's local root.
    pub depth: u32,
    /// Ids directly beneath this node in the *same* graph.
    pub children: Vec<String>,
    pub identity: Option<Identity>,
    /// Present iff this package is a container.
    pub internal: Option<InnerGraph>,
    /// A ghost is a zero-weight reference to a real node elsewhere.
    pub is_ghost: bool,
    pub ghost_target_id: Option<String>,
    /// Id of the top-level container whose nested graph holds the target.
    pub ghost_target_scope: Option<String>,
    /// Layout position, written by the external physics layer. Read here
    /// only for the distance merge tie-break.
    pub x: f32,
    pub y: f32,
}

impl Package {
    /// A fresh leaf package in `Installing` state.
    pub fn new(id: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            state: PackageState::Installing,
            size: 0,
            depth: 0,
            children: Vec::new(),
            identity: None,
            internal: None,
            is_ghost: false,
            ghost_target_id: None,
            ghost_target_scope: None,
            x: 0.0,
            y: 0.0,
        }
    }

    /// The synthetic root node.
    pub fn root() -> Self {
        let mut root = Self::new(ROOT_ID, None);
        root.state = PackageState::Ready;
        root
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Give this package an empty nested graph, making it a container.
    /// Ghosts can never be containers; the call is ignored for them.
    pub fn into_container(mut self) -> Self {
        if !self.is_ghost {
            self.internal = Some(InnerGraph::new());
        }
        self
    }

    pub fn is_container(&self) -> bool {
        self.internal.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    /// Identity name, if any.
    pub fn name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.name.as_str())
    }

    /// Whether this package can participate in duplicate grouping.
    pub fn groupable(&self) -> bool {
        !self.is_ghost && self.identity.is_some()
    }

    /// Squared distance from the scope origin.
    pub fn distance_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }
}
