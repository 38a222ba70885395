//! Dependency graph resolution.
//!
//! Declared BEFORE/AFTER constraints become edges of a [`DependencyGraph`];
//! a min-insertion-index Kahn sort yields a deterministic total order, and a
//! cyclic graph yields a [`CycleReport`] grouping every node on a cycle.

mod graph;
mod sorter;
mod types;
mod validate;

pub use graph::DependencyGraph;
pub use sorter::{resolve, LoadingList, PluginSorter, DEFAULT_SYSTEM_PLUGINS};
pub use types::{
    Cycle, CycleMember, CycleReport, DependencyConstraint, Ordering, PluginInfo, VersionRange,
};
pub use validate::validate;
