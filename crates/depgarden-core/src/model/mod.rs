//! Data model — packages, wires, and nested graphs.

mod package;
mod wire;

pub use package::{Identity, InnerGraph, InternalState, Package, PackageState, ROOT_ID};
pub use wire::{Wire, WireKind};
