//! Integration tests for the spawn-time rule pipeline.
//!
//! Exercises: shard counter → tier → depth cap → container probability,
//! plus the registry and merge tie-break rules the spawner and input
//! layers consume together. All tests are pure logic — no engine, no
//! rendering.

use depgarden_logic::merge_rules::{pick_winner, retention, weight_destroyed, KeepSide, MergeCandidate};
use depgarden_logic::progression::{
    base_container_probability, container_probability, max_depth, snapshot, tier, HARD_CAP,
    TIER_THRESHOLDS,
};
use depgarden_logic::registry::IdentityRegistry;

// ── Helpers ────────────────────────────────────────────────────────────

fn candidate(is_container: bool, depth: u32, distance: f32) -> MergeCandidate {
    MergeCandidate {
        is_container,
        depth,
        distance_sq: distance * distance,
    }
}

// ── Progression pipeline ───────────────────────────────────────────────

#[test]
fn every_tier_threshold_raises_the_depth_cap() {
    for (i, &threshold) in TIER_THRESHOLDS.iter().enumerate() {
        let t = tier(threshold);
        assert_eq!(t, i as u32);
        assert_eq!(max_depth(t), i as u32 + 1);
    }
}

#[test]
fn snapshot_matches_individual_functions() {
    for shards in [0u64, 39, 40, 5_000, 1_000_000] {
        let snap = snapshot(shards);
        assert_eq!(snap.tier, tier(shards));
        assert_eq!(snap.max_depth, max_depth(tier(shards)));
    }
}

#[test]
fn probability_curve_is_monotonic_and_capped() {
    let mut last = 0.0f32;
    for shards in (0..200_000u64).step_by(3_000) {
        let p = base_container_probability(shards);
        assert!(p >= last);
        assert!(p < HARD_CAP);
        last = p;
    }
}

#[test]
fn tree_is_finite_at_every_progression_point() {
    // At any shard count, probability must hit zero at the depth cap, so
    // a spawner that respects the gate can never nest forever.
    for shards in [0u64, 40, 200, 1_000, 5_000, 25_000, 10_000_000] {
        let cap = max_depth(tier(shards));
        assert_eq!(container_probability(shards, cap), 0.0);
        assert!(container_probability(shards, cap - 1) >= 0.0);
    }
}

// ── Registry consumed at spawn time ────────────────────────────────────

#[test]
fn builtin_registry_supports_conflict_seeding() {
    let registry = IdentityRegistry::builtin();
    // The spawner only seeds conflicts between registered names.
    for name in registry.names() {
        for peer in registry.incompatible_with(name) {
            assert!(registry.metadata(peer).is_some());
            assert!(registry.incompatible(name, peer));
        }
    }
}

// ── Merge rules consumed by input handling ─────────────────────────────

#[test]
fn tie_break_chain_is_total_and_order_independent() {
    let cases = [
        (candidate(true, 5, 100.0), candidate(false, 0, 1.0)),
        (candidate(false, 2, 50.0), candidate(false, 1, 80.0)),
        (candidate(false, 1, 10.0), candidate(false, 1, 20.0)),
    ];
    for (a, b) in cases {
        let forward = pick_winner(&a, &b);
        let backward = pick_winner(&b, &a);
        // Swapping arguments must flip the side but keep the same node.
        match forward {
            KeepSide::First => assert_eq!(backward, KeepSide::Second),
            KeepSide::Second => assert_eq!(backward, KeepSide::First),
        }
    }
}

#[test]
fn destruction_shrinks_as_streaks_grow() {
    let size = 1_000;
    let mut last = weight_destroyed(size, 0);
    for combo in 1..12 {
        let destroyed = weight_destroyed(size, combo);
        assert!(destroyed <= last);
        last = destroyed;
    }
    // Retention never reaches 1.0 — merging always costs something at
    // this size.
    assert!(retention(100) < 1.0);
    assert!(weight_destroyed(size, 100) > 0);
}
