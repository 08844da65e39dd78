//! Scope navigation — the drill-down path into nested graphs.
//!
//! The navigator owns an ordered list of container ids locating the graph
//! currently being viewed and edited. Entry is bounded to one level deeper
//! than the current scope: a package can only be entered if it is a
//! container sitting in the current scope's own map. That keeps the path
//! incorruptible — every prefix of a valid path is itself valid.

use serde::{Deserialize, Serialize};

use crate::model::Package;
use crate::store::GraphStore;

/// Path into the nested graph tree. `[]` means root scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeNavigator {
    path: Vec<String>,
}

impl ScopeNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current scope path, outermost container first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Nesting depth of the current scope (0 at root).
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn at_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Descend into a container in the current scope's graph. Fails with no
    /// state change if `id` is not present there or is not a container.
    pub fn enter(&mut self, store: &GraphStore, id: &str) -> bool {
        match store.packages_at(&self.path).get(id) {
            Some(pkg) if pkg.is_container() => {
                self.path.push(id.to_string());
                true
            }
            _ => false,
        }
    }

    /// Pop one level. No-op at root.
    pub fn exit(&mut self) -> bool {
        self.path.pop().is_some()
    }

    /// Clear the path unconditionally.
    pub fn exit_to_root(&mut self) {
        self.path.clear();
    }

    /// The container whose graph is currently exposed (the synthetic root
    /// at root scope). Defensive not-found if the path went stale.
    pub fn current<'a>(&self, store: &'a GraphStore) -> Option<&'a Package> {
        store.resolve(&self.path)
    }
}
