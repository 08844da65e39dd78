//! Tier, nesting-depth cap, and container-spawn probability.
//!
//! All functions here are pure: they map the persistent meta-currency
//! counter ("shards", accumulated across prestige resets) to the values the
//! spawner needs when creating packages. Depth bounding is a policy applied
//! at spawn time — the graph representation itself is unbounded.
//!
//! # Probability shape
//!
//! ```text
//! p(shards) = linear ramp          for shards <= LINEAR_END
//!           = soft cap -> hard cap for shards >  LINEAR_END (asymptotic)
//! p(shards, depth) = p(shards) * (1 - depth / max_depth)
//! ```
//!
//! The depth taper reaches zero at the maximum depth, so the nested tree is
//! always finite regardless of how many shards the player banks.

use serde::{Deserialize, Serialize};

/// Shard thresholds for each tier; the tier is the highest index whose
/// threshold does not exceed the counter.
pub const TIER_THRESHOLDS: [u64; 6] = [0, 40, 200, 1_000, 5_000, 25_000];

/// Probability at zero shards.
pub const BASE_PROBABILITY: f32 = 0.05;
/// Probability reached at the end of the linear region.
pub const SOFT_CAP: f32 = 0.35;
/// Asymptotic ceiling — never reached.
pub const HARD_CAP: f32 = 0.50;
/// Shard count where the linear region ends and the asymptote begins.
pub const LINEAR_END: u64 = 2_000;

/// Summary of everything the spawner needs, bundled for one query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub shards: u64,
    pub tier: u32,
    pub max_depth: u32,
}

/// Progression tier for a shard count.
pub fn tier(shards: u64) -> u32 {
    let mut tier = 0;
    for (i, &threshold) in TIER_THRESHOLDS.iter().enumerate() {
        if shards >= threshold {
            tier = i as u32;
        }
    }
    tier
}

/// Maximum permitted nesting depth at a tier. Depth 1 means containers may
/// appear at root scope but their inner graphs hold only leaves.
pub fn max_depth(tier: u32) -> u32 {
    (tier + 1).min(TIER_THRESHOLDS.len() as u32)
}

/// Probability that a newly spawned package becomes a container, before the
/// depth taper.
pub fn base_container_probability(shards: u64) -> f32 {
    if shards <= LINEAR_END {
        let t = shards as f32 / LINEAR_END as f32;
        BASE_PROBABILITY + (SOFT_CAP - BASE_PROBABILITY) * t
    } else {
        // Approaches HARD_CAP as shards grow, equals SOFT_CAP at LINEAR_END.
        SOFT_CAP + (HARD_CAP - SOFT_CAP) * (1.0 - LINEAR_END as f32 / shards as f32)
    }
}

/// Container-spawn probability at a given depth. Zero at or beyond the
/// maximum depth for the current tier.
pub fn container_probability(shards: u64, depth: u32) -> f32 {
    let cap = max_depth(tier(shards));
    if depth >= cap {
        return 0.0;
    }
    let taper = 1.0 - depth as f32 / cap as f32;
    base_container_probability(shards) * taper
}

/// Bundle the derived values for a shard count.
pub fn snapshot(shards: u64) -> ProgressionSnapshot {
    let tier = tier(shards);
    ProgressionSnapshot {
        shards,
        tier,
        max_depth: max_depth(tier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(tier(0), 0);
        assert_eq!(tier(39), 0);
        assert_eq!(tier(40), 1);
        assert_eq!(tier(999), 2);
        assert_eq!(tier(1_000), 3);
        assert_eq!(tier(1_000_000), 5);
    }

    #[test]
    fn test_max_depth_grows_with_tier() {
        assert_eq!(max_depth(0), 1);
        assert_eq!(max_depth(3), 4);
        assert_eq!(max_depth(5), 6);
        // Never exceeds the table length even for out-of-range tiers.
        assert_eq!(max_depth(40), 6);
    }

    #[test]
    fn test_probability_is_monotonic_in_shards() {
        let mut last = 0.0f32;
        for shards in [0u64, 100, 500, 2_000, 10_000, 100_000, 1_000_000] {
            let p = base_container_probability(shards);
            assert!(p >= last, "probability dropped at {} shards", shards);
            last = p;
        }
    }

    #[test]
    fn test_probability_stays_below_hard_cap() {
        for shards in [0u64, 2_000, 50_000, u64::MAX / 2] {
            assert!(base_container_probability(shards) < HARD_CAP);
        }
    }

    #[test]
    fn test_linear_region_endpoints() {
        assert!((base_container_probability(0) - BASE_PROBABILITY).abs() < 1e-6);
        assert!((base_container_probability(LINEAR_END) - SOFT_CAP).abs() < 1e-6);
    }

    #[test]
    fn test_depth_taper_reaches_zero() {
        let shards = 100_000; // tier 5, max depth 6
        assert!(container_probability(shards, 0) > 0.0);
        assert!(container_probability(shards, 5) > 0.0);
        assert_eq!(container_probability(shards, 6), 0.0);
        assert_eq!(container_probability(shards, 60), 0.0);
    }

    #[test]
    fn test_taper_decreases_with_depth() {
        let shards = 5_000;
        let p0 = container_probability(shards, 0);
        let p1 = container_probability(shards, 1);
        let p2 = container_probability(shards, 2);
        assert!(p0 > p1 && p1 > p2);
    }

    #[test]
    fn test_snapshot_bundles() {
        let snap = snapshot(250);
        assert_eq!(snap.tier, 2);
        assert_eq!(snap.max_depth, 3);
        assert_eq!(snap.shards, 250);
    }
}
