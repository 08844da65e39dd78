//! Graph engine - main entry point for the dependency-graph simulation.
//!
//! Owns the store, the scope navigator, both analyzers, the event queue,
//! and every aggregate counter. All reads and mutations happen
//! synchronously within one logical tick; external components only read
//! accessor results and drain events — they never hold references across
//! ticks, because the underlying maps can be replaced wholesale (prestige,
//! load).
//!
//! Analysis results are memoized behind a generation counter. Every
//! mutation site calls [`GraphEngine::invalidate`]; re-deriving per frame
//! would be correct but wasteful.

use std::io::{Read, Write};

use rand::Rng;
use serde::{Deserialize, Serialize};

use depgarden_logic::merge_rules;
use depgarden_logic::progression;
use depgarden_logic::registry::IdentityRegistry;

use crate::analysis::{
    self, analyze_scope, CrossAnalysis, CrossPackageAnalyzer, HoistLookup, NoHoists, ScopeAnalysis,
};
use crate::events::{EngineEvent, EventQueue};
use crate::model::{InternalState, Package, PackageState, Wire};
use crate::mutation::{self, MergeOutcome, StagedOp, SymlinkOutcome};
use crate::persistence::{self, SaveError};
use crate::scope::ScopeNavigator;
use crate::store::GraphStore;

/// Running totals for the current run, read by the achievements layer.
/// Reset on prestige.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub merges: u64,
    pub symlinks: u64,
    pub weight_destroyed: u64,
    pub weight_saved: u64,
}

/// Main simulation engine for the dependency graph.
pub struct GraphEngine {
    store: GraphStore,
    navigator: ScopeNavigator,
    registry: IdentityRegistry,
    hoists: Box<dyn HoistLookup>,
    cross: CrossPackageAnalyzer,

    scope_cache: Option<ScopeAnalysis>,
    cross_cache: Option<CrossAnalysis>,
    generation: u64,

    events: EventQueue,
    staged: Option<StagedOp>,

    sim_time: f64,
    time_scale: f32,

    combo: u32,
    last_merge_time: f64,

    shards: u64,
    prestige_count: u32,
    stats: EngineStats,
}

impl GraphEngine {
    /// Create an empty engine with the given identity registry.
    pub fn new(registry: IdentityRegistry) -> Self {
        Self {
            store: GraphStore::new(),
            navigator: ScopeNavigator::new(),
            registry,
            hoists: Box::new(NoHoists),
            cross: CrossPackageAnalyzer::new(),
            scope_cache: None,
            cross_cache: None,
            generation: 0,
            events: EventQueue::new(),
            staged: None,
            sim_time: 0.0,
            time_scale: 1.0,
            combo: 0,
            last_merge_time: 0.0,
            shards: 0,
            prestige_count: 0,
            stats: EngineStats::default(),
        }
    }

    /// Replace the hoisting lookup (external subsystem, query only).
    pub fn set_hoist_lookup(&mut self, hoists: Box<dyn HoistLookup>) {
        self.hoists = hoists;
        self.cross_cache = None;
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn shards(&self) -> u64 {
        self.shards
    }

    pub fn prestige_count(&self) -> u32 {
        self.prestige_count
    }

    /// Grant meta-currency (quests, achievements — external callers).
    pub fn add_shards(&mut self, amount: u64) {
        self.shards += amount;
    }

    /// Take every pending event for the renderer/physics layer.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    // ── Tick ────────────────────────────────────────────────────────────

    /// Advance the simulation by wall-clock `delta_seconds`. Completes
    /// staged work and decays the merge combo.
    pub fn update(&mut self, delta_seconds: f32) {
        let scaled = delta_seconds * self.time_scale;
        self.sim_time += scaled as f64;

        if self.combo > 0
            && self.sim_time - self.last_merge_time > merge_rules::COMBO_WINDOW_SECONDS
        {
            self.combo = 0;
        }

        if let Some(op) = self.staged.take() {
            if op.is_complete(self.sim_time) {
                self.finish_staged(op);
            } else {
                self.staged = Some(op);
            }
        }
    }

    // ── Scope navigation ────────────────────────────────────────────────

    pub fn path(&self) -> &[String] {
        self.navigator.path()
    }

    pub fn at_root(&self) -> bool {
        self.navigator.at_root()
    }

    pub fn scope_depth(&self) -> usize {
        self.navigator.depth()
    }

    /// Drill into a container in the current scope. Invalidates the scope
    /// analysis on success.
    pub fn enter(&mut self, id: &str) -> bool {
        if self.navigator.enter(&self.store, id) {
            self.invalidate();
            true
        } else {
            false
        }
    }

    pub fn exit(&mut self) -> bool {
        if self.navigator.exit() {
            self.invalidate();
            true
        } else {
            false
        }
    }

    pub fn exit_to_root(&mut self) {
        if !self.navigator.at_root() {
            self.navigator.exit_to_root();
            self.invalidate();
        }
    }

    /// The container whose graph is currently exposed.
    pub fn current_scope(&self) -> Option<&Package> {
        self.navigator.current(&self.store)
    }

    // ── Analysis ────────────────────────────────────────────────────────

    /// Drop memoized analyses. Called from every mutation site and on
    /// scope changes.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.scope_cache = None;
        self.cross_cache = None;
    }

    /// Duplicate groups and wire conflicts for the current scope,
    /// recomputed only when stale.
    pub fn scope_analysis(&mut self) -> &ScopeAnalysis {
        if self.scope_cache.is_none() {
            self.refresh_scope_analysis();
        }
        self.scope_cache
            .as_ref()
            .expect("scope analysis refreshed above")
    }

    /// Cross-package relationships between top-level containers. Only
    /// meaningful at root scope, but safe to call anywhere.
    pub fn cross_analysis(&mut self) -> &CrossAnalysis {
        if self.cross_cache.is_none() {
            let analysis =
                self.cross
                    .analyze(&mut self.store, &self.registry, self.hoists.as_ref(), self.sim_time);
            self.cross_cache = Some(analysis);
        }
        self.cross_cache
            .as_ref()
            .expect("cross analysis refreshed above")
    }

    /// Whether a package in the current scope is part of a duplicate
    /// relationship (intra-scope group, or cross-package at root).
    pub fn has_duplicate(&mut self, id: &str) -> bool {
        if self.scope_analysis().is_duplicate(id) {
            return true;
        }
        if self.navigator.at_root() {
            return self.cross_analysis().involves(id);
        }
        false
    }

    /// Whether a package in the current scope touches a conflicted wire,
    /// is itself marked conflicted, or (at root) sits on a sibling wire.
    pub fn has_conflict(&mut self, id: &str) -> bool {
        let conflicted: Vec<String> = self.scope_analysis().conflicted_wires.clone();
        let path = self.navigator.path().to_vec();
        let wires = self.store.wires_at(&path);
        if conflicted
            .iter()
            .filter_map(|wid| wires.get(wid))
            .any(|w| w.touches(id))
        {
            return true;
        }
        if self
            .store
            .package_at(&path, id)
            .map(|p| p.state == PackageState::Conflict)
            .unwrap_or(false)
        {
            return true;
        }
        if self.navigator.at_root() {
            return self
                .cross_analysis()
                .sibling_wires
                .iter()
                .any(|w| w.touches(id));
        }
        false
    }

    fn refresh_scope_analysis(&mut self) {
        let path = self.navigator.path().to_vec();
        let at_root = path.is_empty();
        let analysis = match self.store.scope_maps_mut(&path) {
            Some((packages, wires)) => analyze_scope(
                packages,
                wires,
                &self.registry,
                at_root,
                self.sim_time,
                self.generation,
            ),
            None => ScopeAnalysis::empty(self.generation),
        };
        if !at_root {
            let stable = !analysis.has_issues();
            if let Some(container) = self.store.resolve_mut(&path) {
                if let Some(inner) = container.internal.as_mut() {
                    inner.state = if stable {
                        InternalState::Stable
                    } else {
                        InternalState::Unstable
                    };
                }
            }
        }
        self.scope_cache = Some(analysis);
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Merge two same-named packages in the current scope. Invalid targets
    /// return a zero-effect outcome.
    pub fn merge(&mut self, source_id: &str, target_id: &str) -> MergeOutcome {
        if self.combo > 0
            && self.sim_time - self.last_merge_time > merge_rules::COMBO_WINDOW_SECONDS
        {
            self.combo = 0;
        }
        let path = self.navigator.path().to_vec();
        let outcome = mutation::symlink_merge(&mut self.store, &path, source_id, target_id, self.combo);
        if outcome.merged {
            self.combo += 1;
            self.last_merge_time = self.sim_time;
            self.stats.merges += 1;
            self.stats.weight_destroyed += outcome.weight_destroyed;
            if !outcome.relocated.is_empty() {
                self.events.push(EngineEvent::Relocated {
                    ids: outcome.relocated.clone(),
                });
            }
            self.events.push(EngineEvent::Merged {
                winner_id: outcome.winner_id.clone(),
                loser_id: outcome.loser_id.clone(),
                weight_destroyed: outcome.weight_destroyed,
            });
            self.invalidate();
            // Re-evaluate the enclosing container's state right away.
            self.refresh_scope_analysis();
        }
        outcome
    }

    /// Ghost the lighter of two matching inner nodes across two top-level
    /// containers.
    pub fn cross_symlink(&mut self, a_id: &str, b_id: &str, name: &str) -> SymlinkOutcome {
        let outcome = mutation::cross_package_symlink(&mut self.store, a_id, b_id, name);
        if outcome.linked {
            self.stats.symlinks += 1;
            self.stats.weight_saved += outcome.weight_saved;
            self.events.push(EngineEvent::Ghosted {
                ghost_id: outcome.ghost_id.clone(),
                target_id: outcome.target_id.clone(),
                weight_saved: outcome.weight_saved,
            });
            self.invalidate();
        }
        outcome
    }

    // ── Spawner-facing structural API ───────────────────────────────────

    pub fn alloc_package_id(&mut self) -> String {
        self.store.alloc_package_id()
    }

    pub fn alloc_wire_id(&mut self) -> String {
        self.store.alloc_wire_id()
    }

    pub fn insert_package(&mut self, path: &[String], pkg: Package) -> bool {
        let inserted = self.store.insert_package(path, pkg);
        if inserted {
            self.invalidate();
        }
        inserted
    }

    pub fn insert_wire(&mut self, path: &[String], wire: Wire) -> bool {
        let inserted = self.store.insert_wire(path, wire);
        if inserted {
            self.invalidate();
        }
        inserted
    }

    /// Remove a package (conflict resolution, upgrades). Invalidates on
    /// success.
    pub fn remove_package(&mut self, path: &[String], id: &str) -> Option<Package> {
        let removed = self.store.remove_package(path, id);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    pub fn remove_wire(&mut self, path: &[String], wire_id: &str) -> Option<Wire> {
        let removed = self.store.remove_wire(path, wire_id);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    /// Position write-back from the physics layer. Not structural — no
    /// invalidation.
    pub fn update_position(&mut self, path: &[String], id: &str, x: f32, y: f32) {
        if let Some(pkg) = self.store.package_at_mut(path, id) {
            pkg.x = x;
            pkg.y = y;
        }
    }

    // ── Progression ─────────────────────────────────────────────────────

    pub fn tier(&self) -> u32 {
        progression::tier(self.shards)
    }

    pub fn max_depth(&self) -> u32 {
        progression::max_depth(self.tier())
    }

    pub fn container_probability(&self, depth: u32) -> f32 {
        progression::container_probability(self.shards, depth)
    }

    /// Sample whether a newly spawned package becomes a container.
    pub fn rolls_container<R: Rng + ?Sized>(&self, depth: u32, rng: &mut R) -> bool {
        rng.gen::<f32>() < self.container_probability(depth)
    }

    // ── Staged operations ───────────────────────────────────────────────

    /// Stage an auto-resolve of the current scope's duplicate groups,
    /// completing after `duration` seconds of sim time. One staged
    /// operation at a time.
    pub fn stage_auto_resolve(&mut self, duration: f64) -> bool {
        if self.staged.is_some() {
            return false;
        }
        self.staged = Some(StagedOp::auto_resolve(
            self.navigator.path().to_vec(),
            self.sim_time,
            duration,
        ));
        true
    }

    /// Cancel the staged operation, if any. Nothing is rolled back —
    /// staged work has no effect before its completion tick.
    pub fn cancel_staged(&mut self) -> bool {
        self.staged.take().is_some()
    }

    pub fn staged(&self) -> Option<&StagedOp> {
        self.staged.as_ref()
    }

    fn finish_staged(&mut self, op: StagedOp) {
        match op.kind {
            mutation::StagedKind::AutoResolve => {
                let at_root = op.scope.is_empty();
                let mut merges: u32 = 0;
                let mut destroyed: u64 = 0;
                loop {
                    let pair = {
                        let packages = self.store.packages_at(&op.scope);
                        analysis::duplicate_groups_in(packages, at_root)
                            .into_iter()
                            .next()
                            .map(|(_, ids)| (ids[0].clone(), ids[1].clone()))
                    };
                    let (a, b) = match pair {
                        Some(pair) => pair,
                        None => break,
                    };
                    // Automation earns no combo.
                    let outcome = mutation::symlink_merge(&mut self.store, &op.scope, &a, &b, 0);
                    if !outcome.merged {
                        break;
                    }
                    merges += 1;
                    destroyed += outcome.weight_destroyed;
                    if !outcome.relocated.is_empty() {
                        self.events.push(EngineEvent::Relocated {
                            ids: outcome.relocated,
                        });
                    }
                }
                self.stats.merges += merges as u64;
                self.stats.weight_destroyed += destroyed;
                self.events.push(EngineEvent::AutoResolveFinished {
                    merges,
                    weight_destroyed: destroyed,
                });
                self.invalidate();
                self.refresh_scope_analysis();
            }
        }
    }

    // ── Prestige ────────────────────────────────────────────────────────

    /// Ship the tree: replace the whole graph, keep the meta-currency.
    /// Returns the shard award for this run.
    pub fn prestige(&mut self) -> u64 {
        let award = (self.stats.weight_destroyed + self.stats.weight_saved) / 10;
        self.shards += award;
        self.prestige_count += 1;
        self.store = GraphStore::new();
        self.navigator.exit_to_root();
        self.cross = CrossPackageAnalyzer::new();
        self.staged = None;
        self.combo = 0;
        self.last_merge_time = 0.0;
        self.stats = EngineStats::default();
        self.invalidate();
        self.events.push(EngineEvent::GraphReset);
        award
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Save the full engine state to a writer (binary).
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        persistence::save_graph(
            writer,
            &self.store,
            self.sim_time,
            self.time_scale,
            self.shards,
            self.prestige_count,
            self.combo,
            self.last_merge_time,
            self.stats,
        )
    }

    /// Load engine state from a reader, replacing the graph wholesale.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let loaded = persistence::load_graph(reader)?;
        self.apply_loaded(loaded);
        Ok(())
    }

    /// JSON snapshot for external tooling.
    pub fn export_json(&self) -> Result<String, SaveError> {
        persistence::export_json(
            &self.store,
            self.sim_time,
            self.time_scale,
            self.shards,
            self.prestige_count,
            self.combo,
            self.last_merge_time,
            self.stats,
        )
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), SaveError> {
        let loaded = persistence::import_json(json)?;
        self.apply_loaded(loaded);
        Ok(())
    }

    fn apply_loaded(&mut self, loaded: persistence::LoadedGraph) {
        self.store = loaded.store;
        self.sim_time = loaded.sim_time;
        self.time_scale = loaded.time_scale;
        self.shards = loaded.shards;
        self.prestige_count = loaded.prestige_count;
        self.combo = loaded.combo;
        self.last_merge_time = loaded.last_merge_time;
        self.stats = loaded.stats;
        self.navigator.exit_to_root();
        self.cross = CrossPackageAnalyzer::new();
        self.staged = None;
        self.invalidate();
        self.events.push(EngineEvent::GraphReset);
    }
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new(IdentityRegistry::builtin())
    }
}
