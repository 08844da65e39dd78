//! Mutations — the only code that structurally rewrites the graph.

mod merge;
mod staged;
mod symlink;

pub use merge::{symlink_merge, MergeOutcome};
pub use staged::{StagedKind, StagedOp};
pub use symlink::{cross_package_symlink, SymlinkOutcome};
