//! Stage transitions: one dependency-ordered dispatch of a stage to every
//! plugin.
//!
//! ```text
//! StateTransition::build(stage, plugins, executors, progress, hooks)
//!   ↓
//! per plugin: gather(predecessor tasks) → submit(handler, listener) → advance stage
//!   ↓
//! pre hook → gather(all tasks) → to_aggregate_outcome() → post hook
//!   ↓
//! final activity (default: barrier on the sync executor)
//! ```

mod aggregate;
mod engine;
mod types;

pub use aggregate::{gather, to_aggregate_outcome, AggregateError, TaskFailure};
pub use engine::{sync_barrier, TransitionFuture};
pub use types::{
    EventGenerator, FinalActivityFn, NextStageFn, StageEvent, StageHook, StageHooks,
    StateTransition, ThreadSelector,
};
