//! Staged operations — long-running work expressed as explicit in-progress
//! state that completes on a later tick.
//!
//! There is no true async here: a staged record holds its start timestamp
//! and duration, the engine checks it each tick, and all effects happen at
//! the completion tick. Cancelling is just clearing the record, so staged
//! work must have no irreversible side effect before completion.

use serde::{Deserialize, Serialize};

/// What a staged operation will do when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StagedKind {
    /// Batch-merge every duplicate group in the staged scope.
    AutoResolve,
}

/// An in-progress record for one staged operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedOp {
    pub kind: StagedKind,
    /// Scope captured when the operation was staged; completion applies
    /// there even if the player navigated away meanwhile.
    pub scope: Vec<String>,
    /// Sim time the operation was staged.
    pub started_at: f64,
    /// Seconds of sim time until completion.
    pub duration: f64,
}

impl StagedOp {
    pub fn auto_resolve(scope: Vec<String>, started_at: f64, duration: f64) -> Self {
        Self {
            kind: StagedKind::AutoResolve,
            scope,
            started_at,
            duration,
        }
    }

    pub fn is_complete(&self, now: f64) -> bool {
        now - self.started_at >= self.duration
    }

    /// Completion fraction in `[0, 1]` for progress indicators.
    pub fn progress(&self, now: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.started_at) / self.duration).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_threshold() {
        let op = StagedOp::auto_resolve(vec![], 10.0, 5.0);
        assert!(!op.is_complete(14.9));
        assert!(op.is_complete(15.0));
    }

    #[test]
    fn test_progress_clamps() {
        let op = StagedOp::auto_resolve(vec![], 10.0, 5.0);
        assert_eq!(op.progress(9.0), 0.0);
        assert_eq!(op.progress(12.5), 0.5);
        assert_eq!(op.progress(99.0), 1.0);
    }

    #[test]
    fn test_zero_duration_is_immediately_complete() {
        let op = StagedOp::auto_resolve(vec![], 3.0, 0.0);
        assert!(op.is_complete(3.0));
        assert_eq!(op.progress(3.0), 1.0);
    }
}
