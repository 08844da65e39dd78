//! Depgarden Core - Dependency Graph Simulation Engine
//!
//! The simulation core of an idle game about dependency trees: a
//! recursively nested graph of packages (nodes) and wires (edges) that the
//! player installs, inspects, merges, and ships.
//!
//! # Architecture
//!
//! - **Model**: plain data — packages, wires, nested graphs
//! - **Store**: id-keyed arenas, path-addressed nesting, weight accounting
//! - **Navigator**: the drill-down scope path
//! - **Analyzers**: duplicate/conflict sets, memoized behind a generation
//!   counter
//! - **Mutations**: symlink merges, cross-package ghosting, staged ops
//! - **Engine**: single owner of all of the above, ticked by the host
//!
//! # Example
//!
//! ```rust
//! use depgarden_core::prelude::*;
//!
//! let mut engine = GraphEngine::default();
//! let id = engine.alloc_package_id();
//! engine.insert_package(&[], Package::new(id, Some(ROOT_ID.into())));
//!
//! // Run simulation
//! engine.update(1.0 / 60.0); // 60 FPS
//! ```

pub mod analysis;
pub mod engine;
pub mod events;
pub mod model;
pub mod mutation;
pub mod persistence;
pub mod scope;
pub mod store;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::analysis::{CrossAnalysis, HoistLookup, NoHoists, ScopeAnalysis};
    pub use crate::engine::{EngineStats, GraphEngine};
    pub use crate::events::EngineEvent;
    pub use crate::model::{
        Identity, InnerGraph, InternalState, Package, PackageState, Wire, WireKind, ROOT_ID,
    };
    pub use crate::mutation::{MergeOutcome, SymlinkOutcome};
    pub use crate::scope::ScopeNavigator;
    pub use crate::store::GraphStore;
}
