//! Staged, dependency-ordered plugin loading.
//!
//! ```text
//! Vec<PluginInfo>
//!   ↓
//! PluginSorter::sort() → validate(), DependencyGraph::topological_sort()
//!   ↓
//! LoadingList { plugins, graph, error }      (system-only order on failure)
//!   ↓
//! Loader::new(list, StageCatalog, containers, Executors)
//!   ↓
//! Loader::run() → for each stage: inline work, StateTransition::build()
//!   ↓
//! LoadReport | LoaderError::LoadingFailed { errors }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod loader;
pub mod plugin;
pub mod progress;
pub mod resolver;
pub mod stage;
pub mod transition;

pub use error::{ErrorPayload, LoaderError, ResolveError, TransitionError};
pub use executor::{Executor, Executors, ParallelExecutor, SyncExecutor};
pub use loader::{LoadReport, Loader};
pub use plugin::{DispatchContext, PluginContainer, PluginList};
pub use progress::{NoopProgress, ProgressMonitor, ProgressReporter, ProgressSink};
pub use resolver::{
    resolve, validate, DependencyConstraint, DependencyGraph, LoadingList, Ordering, PluginInfo,
    PluginSorter, VersionRange,
};
pub use stage::{LifecycleStage, Phase, StageCatalog, StageName};
pub use transition::{
    gather, to_aggregate_outcome, AggregateError, StageEvent, StageHooks, StateTransition,
    TaskFailure, ThreadSelector,
};
