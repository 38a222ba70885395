//! Per-plugin runtime records.

mod container;
mod list;

pub use container::{DispatchContext, EventListener, PluginContainer, StageHandler};
pub use list::PluginList;
