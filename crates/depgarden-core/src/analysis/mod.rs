//! Analyzers — derived duplicate/conflict sets, recomputed on demand.

mod cross;
mod scope;

pub use cross::{CrossAnalysis, CrossDuplicate, CrossPackageAnalyzer, HoistLookup, NoHoists};
pub use scope::{analyze_scope, DuplicateGroup, ScopeAnalysis};

pub(crate) use scope::duplicate_groups_in;
