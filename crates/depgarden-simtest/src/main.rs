//! Depgarden Headless Simulation Harness
//!
//! Validates graph logic and data without rendering or input.
//! Runs entirely in-process — no window, no physics, no audio.
//!
//! Usage:
//!   cargo run -p depgarden-simtest
//!   cargo run -p depgarden-simtest -- --verbose

use depgarden_core::prelude::*;
use depgarden_logic::merge_rules::{self, KeepSide, MergeCandidate};
use depgarden_logic::progression;
use depgarden_logic::registry::IdentityRegistry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

// ── Identity data (same JSON the logic crate embeds) ────────────────────
const IDENTITIES_JSON: &str = include_str!("../../../data/identities.json");

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct IdentitySpec {
    name: String,
    label: String,
    category: String,
}

#[derive(Debug, Deserialize)]
struct IdentityFile {
    identities: Vec<IdentitySpec>,
    incompatible: Vec<(String, String)>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: String) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail,
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Depgarden Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Identity registry data
    results.extend(validate_registry_data(verbose));

    // 2. Progression curve sweep
    results.extend(validate_progression(verbose));

    // 3. Merge rule sweep
    results.extend(validate_merge_rules(verbose));

    // 4. Scope navigation on a nested graph
    results.extend(validate_navigation(verbose));

    // 5. Cross-package analysis and ghosting
    results.extend(validate_cross_package(verbose));

    // 6. Randomized merge storm (weight conservation)
    results.extend(validate_merge_storm(verbose));

    // 7. Persistence round-trip
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Identity registry ────────────────────────────────────────────────

fn validate_registry_data(_verbose: bool) -> Vec<TestResult> {
    println!("--- Identity Registry ---");
    let mut results = Vec::new();

    // Raw file shape first, then the parsed registry.
    let raw: IdentityFile = match serde_json::from_str(IDENTITIES_JSON) {
        Ok(f) => f,
        Err(e) => {
            results.push(check(
                "registry_parse",
                false,
                format!("JSON parse error: {}", e),
            ));
            return results;
        }
    };
    let registry = match IdentityRegistry::from_json(IDENTITIES_JSON) {
        Ok(r) => r,
        Err(e) => {
            results.push(check(
                "registry_build",
                false,
                format!("registry build error: {}", e),
            ));
            return results;
        }
    };

    results.push(check(
        "registry_not_empty",
        registry.len() > 20,
        format!("{} identities loaded", registry.len()),
    ));

    // No duplicate names in the data file.
    let mut seen = std::collections::BTreeSet::new();
    let dupes = raw
        .identities
        .iter()
        .filter(|s| !seen.insert(s.name.as_str()))
        .count();
    results.push(check(
        "names_unique",
        dupes == 0,
        format!("{} duplicate names in data file", dupes),
    ));

    // No pair lists a name against itself.
    let self_pairs = raw.incompatible.iter().filter(|(a, b)| a == b).count();
    results.push(check(
        "no_self_incompatibility",
        self_pairs == 0,
        format!("{} self-referential pairs", self_pairs),
    ));

    // Every incompatibility endpoint is a registered identity.
    let unknown: Vec<&str> = registry
        .names()
        .flat_map(|n| registry.incompatible_with(n))
        .filter(|peer| registry.metadata(peer).is_none())
        .collect();
    results.push(check(
        "incompatibilities_reference_known_names",
        unknown.is_empty(),
        if unknown.is_empty() {
            "all pairs reference registered identities".into()
        } else {
            format!("unknown names: {:?}", unknown)
        },
    ));

    // Symmetry spot-check across the whole table.
    let asymmetric = registry
        .names()
        .any(|a| {
            registry
                .incompatible_with(a)
                .iter()
                .any(|b| !registry.incompatible(b, a))
        });
    results.push(check(
        "incompatibility_symmetric",
        !asymmetric,
        "relation is symmetric".into(),
    ));

    // Labels present for every entry.
    let unlabeled = registry
        .names()
        .filter(|n| {
            registry
                .metadata(n)
                .map(|m| m.label.is_empty())
                .unwrap_or(true)
        })
        .count();
    results.push(check(
        "labels_present",
        unlabeled == 0,
        format!("{} entries missing labels", unlabeled),
    ));

    results
}

// ── 2. Progression ──────────────────────────────────────────────────────

fn validate_progression(verbose: bool) -> Vec<TestResult> {
    println!("--- Progression Curve ---");
    let mut results = Vec::new();

    // Monotonic in shards at every depth below the cap.
    let mut monotonic = true;
    let samples = [0u64, 10, 100, 500, 2_000, 10_000, 100_000];
    for depth in 0..3 {
        let mut last = -1.0f32;
        for &shards in &samples {
            let p = progression::container_probability(shards, depth);
            if progression::max_depth(progression::tier(shards)) > depth && p < last {
                monotonic = false;
            }
            last = p;
            if verbose {
                println!("  shards={} depth={} p={:.3}", shards, depth, p);
            }
        }
    }
    results.push(check(
        "probability_monotonic",
        monotonic,
        "probability never drops as shards grow".into(),
    ));

    // Hard cap holds everywhere.
    let capped = samples
        .iter()
        .all(|&s| progression::base_container_probability(s) < progression::HARD_CAP);
    results.push(check(
        "hard_cap_holds",
        capped,
        format!("all samples below {}", progression::HARD_CAP),
    ));

    // Taper guarantees a finite tree at every tier.
    let finite = (0..=5u32).all(|tier| {
        let shards = progression::TIER_THRESHOLDS[tier as usize];
        let depth = progression::max_depth(tier);
        progression::container_probability(shards, depth) == 0.0
    });
    results.push(check(
        "taper_reaches_zero_at_max_depth",
        finite,
        "container probability is zero at the depth cap for every tier".into(),
    ));

    results
}

// ── 3. Merge rules ──────────────────────────────────────────────────────

fn validate_merge_rules(_verbose: bool) -> Vec<TestResult> {
    println!("--- Merge Rules ---");
    let mut results = Vec::new();

    let in_bounds = (0..64).all(|combo| {
        let r = merge_rules::retention(combo);
        (merge_rules::MIN_RETENTION..=merge_rules::MAX_RETENTION).contains(&r)
    });
    results.push(check(
        "retention_in_bounds",
        in_bounds,
        "retention stays within [0.5, 0.95]".into(),
    ));

    // Depth outranks distance in the keep/vanish chain.
    let p = MergeCandidate {
        is_container: false,
        depth: 2,
        distance_sq: 50.0 * 50.0,
    };
    let q = MergeCandidate {
        is_container: false,
        depth: 1,
        distance_sq: 80.0 * 80.0,
    };
    let both_orders = merge_rules::pick_winner(&p, &q) == KeepSide::Second
        && merge_rules::pick_winner(&q, &p) == KeepSide::First;
    results.push(check(
        "tie_break_order_independent",
        both_orders,
        "lower depth wins regardless of argument order".into(),
    ));

    results
}

// ── 4. Navigation ───────────────────────────────────────────────────────

fn validate_navigation(_verbose: bool) -> Vec<TestResult> {
    println!("--- Scope Navigation ---");
    let mut results = Vec::new();

    let mut engine = GraphEngine::default();
    engine.insert_package(
        &[],
        Package::new("pkg-1", Some(ROOT_ID.into())).into_container(),
    );
    engine.insert_package(
        &["pkg-1".to_string()],
        Package::new("pkg-2", Some("pkg-1".into())).into_container(),
    );
    engine.insert_package(
        &["pkg-1".to_string(), "pkg-2".to_string()],
        Package::new("pkg-3", Some("pkg-2".into())),
    );

    let descended = engine.enter("pkg-1") && engine.enter("pkg-2");
    results.push(check(
        "drill_down_two_levels",
        descended && engine.scope_depth() == 2,
        format!("path = {:?}", engine.path()),
    ));

    let leaf_blocked = !engine.enter("pkg-3");
    results.push(check(
        "leaf_entry_blocked",
        leaf_blocked,
        "leaves cannot be entered".into(),
    ));

    engine.exit_to_root();
    results.push(check(
        "exit_to_root",
        engine.at_root(),
        "path cleared".into(),
    ));

    results
}

// ── 5. Cross-package analysis ───────────────────────────────────────────

fn validate_cross_package(_verbose: bool) -> Vec<TestResult> {
    println!("--- Cross-Package Analysis ---");
    let mut results = Vec::new();

    let mut engine = GraphEngine::default();
    for (cid, nid, name, size) in [
        ("pkg-1", "pkg-10", "lodash", 40u64),
        ("pkg-2", "pkg-20", "lodash", 70),
        ("pkg-3", "pkg-30", "date-fns", 25),
    ] {
        engine.insert_package(
            &[],
            Package::new(cid, Some(ROOT_ID.into())).into_container(),
        );
        engine.insert_package(
            &[cid.to_string()],
            Package::new(nid, Some(cid.to_string()))
                .with_identity(Identity::new(name, name))
                .with_size(size),
        );
    }
    // A fourth container with moment, incompatible with date-fns.
    engine.insert_package(
        &[],
        Package::new("pkg-4", Some(ROOT_ID.into())).into_container(),
    );
    engine.insert_package(
        &["pkg-4".to_string()],
        Package::new("pkg-40", Some("pkg-4".to_string()))
            .with_identity(Identity::new("moment", "Moment"))
            .with_size(15),
    );

    let analysis = engine.cross_analysis().clone();
    results.push(check(
        "duplicate_pair_detected",
        analysis.duplicates.len() == 1 && analysis.duplicates[0].name == "lodash",
        format!("{} duplicate relationships", analysis.duplicates.len()),
    ));
    results.push(check(
        "conflict_sibling_wire_materialized",
        analysis.sibling_wires.len() == 1
            && analysis.sibling_wires[0].touches("pkg-3")
            && analysis.sibling_wires[0].touches("pkg-4"),
        format!("{} sibling wires", analysis.sibling_wires.len()),
    ));

    let weight_before = engine.store().global_weight();
    let outcome = engine.cross_symlink("pkg-1", "pkg-2", "lodash");
    results.push(check(
        "symlink_ghosts_lighter_container",
        outcome.linked && outcome.ghost_container == "pkg-1" && outcome.weight_saved == 40,
        format!(
            "ghost in {} saved {}",
            outcome.ghost_container, outcome.weight_saved
        ),
    ));
    results.push(check(
        "global_weight_drops_by_saved_amount",
        engine.store().global_weight() == weight_before - 40,
        format!("weight {}", engine.store().global_weight()),
    ));

    let cleared = engine.cross_analysis().duplicates.is_empty();
    results.push(check(
        "duplicate_cleared_after_symlink",
        cleared,
        "relationship gone on next pass".into(),
    ));

    results
}

// ── 6. Randomized merge storm ───────────────────────────────────────────

fn validate_merge_storm(verbose: bool) -> Vec<TestResult> {
    println!("--- Merge Storm ---");
    let mut results = Vec::new();

    let names = ["lodash", "moment", "axios", "react", "glob", "uuid"];
    let mut rng = StdRng::seed_from_u64(42);

    let mut engine = GraphEngine::default();
    for _ in 0..60 {
        let id = engine.alloc_package_id();
        let name = names[rng.gen_range(0..names.len())];
        let pkg = Package::new(&id, Some(ROOT_ID.into()))
            .with_identity(Identity::new(name, name))
            .with_size(rng.gen_range(1..100))
            .with_depth(rng.gen_range(1..4))
            .at(rng.gen_range(-200.0..200.0), rng.gen_range(-200.0..200.0));
        engine.insert_package(&[], pkg);
    }
    // Random wires between existing packages.
    let ids: Vec<String> = engine.store().packages_at(&[]).keys().cloned().collect();
    for _ in 0..80 {
        let wid = engine.alloc_wire_id();
        let from = &ids[rng.gen_range(0..ids.len())];
        let to = &ids[rng.gen_range(0..ids.len())];
        engine.insert_wire(&[], Wire::new(&wid, from, to, WireKind::Dependency));
    }

    let mut expected = engine.store().global_weight();
    let mut merges = 0;
    for _ in 0..200 {
        let ids: Vec<String> = engine.store().packages_at(&[]).keys().cloned().collect();
        let a = &ids[rng.gen_range(0..ids.len())];
        let b = &ids[rng.gen_range(0..ids.len())];
        let outcome = engine.merge(a, b);
        if outcome.merged {
            merges += 1;
            expected -= outcome.weight_destroyed;
        }
    }
    if verbose {
        println!("  {} merges landed", merges);
    }

    results.push(check(
        "weight_conserved",
        engine.store().global_weight() == expected,
        format!(
            "global {} after {} merges",
            engine.store().global_weight(),
            merges
        ),
    ));

    let packages = engine.store().packages_at(&[]);
    let wires = engine.store().wires_at(&[]);
    let dangling = wires
        .values()
        .filter(|w| !packages.contains_key(&w.from_id) || !packages.contains_key(&w.to_id))
        .count();
    results.push(check(
        "no_dangling_wires",
        dangling == 0,
        format!("{} dangling wires", dangling),
    ));

    let mut pairs = std::collections::BTreeSet::new();
    let duplicate_edges = wires
        .values()
        .filter(|w| !pairs.insert((w.from_id.clone(), w.to_id.clone())))
        .count();
    results.push(check(
        "no_duplicate_edges",
        duplicate_edges == 0,
        format!("{} duplicate edges", duplicate_edges),
    ));

    results.push(check(
        "merges_landed",
        merges > 10,
        format!("{} merges", merges),
    ));

    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut engine = GraphEngine::default();
    engine.insert_package(
        &[],
        Package::new("pkg-1", Some(ROOT_ID.into())).into_container(),
    );
    engine.insert_package(
        &["pkg-1".to_string()],
        Package::new("pkg-2", Some("pkg-1".into())).into_container(),
    );
    engine.insert_package(
        &["pkg-1".to_string(), "pkg-2".to_string()],
        Package::new("pkg-3", Some("pkg-2".into()))
            .with_identity(Identity::new("lodash", "Lodash"))
            .with_size(9),
    );
    engine.add_shards(123);

    let mut buf = Vec::new();
    if let Err(e) = engine.save(&mut buf) {
        results.push(check("save", false, format!("save failed: {}", e)));
        return results;
    }

    let mut restored = GraphEngine::default();
    match restored.load(buf.as_slice()) {
        Ok(()) => {
            results.push(check(
                "binary_roundtrip",
                restored.store().package_count() == engine.store().package_count()
                    && restored.store().global_weight() == engine.store().global_weight()
                    && restored.shards() == 123,
                format!(
                    "{} packages, weight {}",
                    restored.store().package_count(),
                    restored.store().global_weight()
                ),
            ));
            let deep = restored
                .store()
                .package_at(&["pkg-1".to_string(), "pkg-2".to_string()], "pkg-3")
                .is_some();
            results.push(check(
                "nested_depth_preserved",
                deep,
                "two-level nesting survives".into(),
            ));
        }
        Err(e) => results.push(check("binary_roundtrip", false, format!("load failed: {}", e))),
    }

    let json = engine.export_json();
    let json_ok = match json {
        Ok(ref s) => {
            let mut from_json = GraphEngine::default();
            from_json.import_json(s).is_ok()
                && from_json.store().package_count() == engine.store().package_count()
        }
        Err(_) => false,
    };
    results.push(check(
        "json_roundtrip",
        json_ok,
        "JSON snapshot imports cleanly".into(),
    ));

    results
}
