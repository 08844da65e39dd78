//! Wires — directed edges between package ids within one graph.

use serde::{Deserialize, Serialize};

/// Edge flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireKind {
    /// Ordinary structural dependency.
    Dependency,
    /// Created by a merge — the winner now stands in for the loser.
    Symlink,
    /// Synthetic root-scope edge between two top-level containers,
    /// visualizing a cross-package conflict. Recomputed every analysis
    /// pass, never persisted.
    Sibling,
}

/// A directed edge between two node ids in the *same* graph. Wires never
/// cross graph boundaries; sibling wires live outside the structural maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub kind: WireKind,
    /// Set when the endpoints' identities are mutually incompatible.
    pub conflicted: bool,
    /// Sim time the conflict was first detected, for pulse animation.
    pub conflict_time: Option<f64>,
}

impl Wire {
    pub fn new(
        id: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        kind: WireKind,
    ) -> Self {
        Self {
            id: id.into(),
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind,
            conflicted: false,
            conflict_time: None,
        }
    }

    /// Whether either endpoint is the given id.
    pub fn touches(&self, id: &str) -> bool {
        self.from_id == id || self.to_id == id
    }

    /// The opposite endpoint, or `None` if `id` is not an endpoint.
    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.from_id == id {
            Some(self.to_id.as_str())
        } else if self.to_id == id {
            Some(self.from_id.as_str())
        } else {
            None
        }
    }

    /// Mark conflicted, stamping the time only on the first detection.
    pub fn mark_conflicted(&mut self, now: f64) {
        if !self.conflicted {
            self.conflicted = true;
            self.conflict_time = Some(now);
        }
    }

    /// Clear the conflict flag and its timestamp.
    pub fn clear_conflict(&mut self) {
        self.conflicted = false;
        self.conflict_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_and_other_end() {
        let wire = Wire::new("wire-1", "pkg-1", "pkg-2", WireKind::Dependency);
        assert!(wire.touches("pkg-1"));
        assert!(wire.touches("pkg-2"));
        assert!(!wire.touches("pkg-3"));
        assert_eq!(wire.other_end("pkg-1"), Some("pkg-2"));
        assert_eq!(wire.other_end("pkg-3"), None);
    }

    #[test]
    fn test_conflict_time_stamped_once() {
        let mut wire = Wire::new("wire-2", "a", "b", WireKind::Dependency);
        wire.mark_conflicted(1.5);
        assert_eq!(wire.conflict_time, Some(1.5));
        wire.mark_conflicted(9.0);
        assert_eq!(wire.conflict_time, Some(1.5));
        wire.clear_conflict();
        assert!(!wire.conflicted);
        assert_eq!(wire.conflict_time, None);
    }
}
