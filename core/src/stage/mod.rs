//! Lifecycle stages and the catalog that chains them.

mod catalog;
mod types;

pub use catalog::StageCatalog;
pub use types::{InlineFn, LifecycleStage, MessageFn, Phase, SizeFn, StageBuilder, StageName};
