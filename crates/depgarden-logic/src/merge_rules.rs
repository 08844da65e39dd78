//! Symlink-merge tie-breaking and the weight retention curve.
//!
//! When two same-named packages merge, one survives (the winner) and the
//! other is absorbed (the loser). Which one survives is a pure function of
//! structural facts — container-ness, depth, distance from the scope
//! origin — so the outcome is the same regardless of which node the player
//! dragged onto which.
//!
//! The retention curve decides how much of the loser's weight is destroyed:
//! longer merge streaks (the combo counter) retain more.

use serde::{Deserialize, Serialize};

/// Fraction of the loser's weight retained at combo 0.
pub const MIN_RETENTION: f64 = 0.5;
/// Retention ceiling — some weight is always destroyed.
pub const MAX_RETENTION: f64 = 0.95;
/// Retention gained per combo step.
pub const RETENTION_PER_COMBO: f64 = 0.05;
/// Seconds between merges before the combo streak resets.
pub const COMBO_WINDOW_SECONDS: f64 = 4.0;

/// Which of the two merge candidates survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeepSide {
    First,
    Second,
}

/// Structural facts about one merge candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MergeCandidate {
    pub is_container: bool,
    pub depth: u32,
    /// Squared Euclidean distance from the scope origin.
    pub distance_sq: f32,
}

/// Fraction of the loser's weight retained for a given combo count.
pub fn retention(combo: u32) -> f64 {
    (MIN_RETENTION + RETENTION_PER_COMBO * combo as f64).min(MAX_RETENTION)
}

/// Weight destroyed when absorbing a loser of the given size.
pub fn weight_destroyed(loser_size: u64, combo: u32) -> u64 {
    (loser_size as f64 * (1.0 - retention(combo))).floor() as u64
}

/// Tie-break which candidate survives a merge, in order:
/// 1. a container beats a non-container;
/// 2. lower depth wins;
/// 3. smaller distance from the scope origin wins.
pub fn pick_winner(first: &MergeCandidate, second: &MergeCandidate) -> KeepSide {
    if first.is_container != second.is_container {
        return if first.is_container {
            KeepSide::First
        } else {
            KeepSide::Second
        };
    }
    if first.depth != second.depth {
        return if first.depth < second.depth {
            KeepSide::First
        } else {
            KeepSide::Second
        };
    }
    if second.distance_sq < first.distance_sq {
        KeepSide::Second
    } else {
        KeepSide::First
    }
}
