//! Engine events — signals for the external physics/renderer layer.
//!
//! Mutations never call out; they queue events here and the host drains
//! the queue on its own schedule, once per frame.

/// Something the outside world may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Reparented subtree roots that should be physically relocated.
    Relocated { ids: Vec<String> },
    /// An intra-scope merge completed.
    Merged {
        winner_id: String,
        loser_id: String,
        weight_destroyed: u64,
    },
    /// A cross-package symlink created a ghost.
    Ghosted {
        ghost_id: String,
        target_id: String,
        weight_saved: u64,
    },
    /// A staged auto-resolve finished.
    AutoResolveFinished { merges: u32, weight_destroyed: u64 },
    /// The whole graph was replaced (prestige or load).
    GraphReset,
}

/// FIFO queue of pending events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<EngineEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Take every pending event, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
