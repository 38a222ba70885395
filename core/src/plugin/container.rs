use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::stage::StageName;
use crate::transition::StageEvent;

/// The plugin currently being dispatched to, handed to its handler and
/// listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    pub plugin: String,
    pub stage: StageName,
}

pub type StageHandler = Arc<dyn Fn(&DispatchContext) -> anyhow::Result<()> + Send + Sync>;
pub type EventListener =
    Arc<dyn Fn(&StageEvent, &DispatchContext) -> anyhow::Result<()> + Send + Sync>;

/// Runtime record of one loaded plugin.
///
/// The current stage is written only by the transition engine, one task
/// per plugin per transition.
pub struct PluginContainer {
    id: String,
    version: String,
    stage: Mutex<StageName>,
    activities: HashMap<StageName, StageHandler>,
    listener: Option<EventListener>,
    dependencies: Vec<String>,
}

impl PluginContainer {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            stage: Mutex::new(StageName::error()),
            activities: HashMap::new(),
            listener: None,
            dependencies: Vec::new(),
        }
    }

    /// Run `handler` when this plugin is dispatched while in `stage`.
    pub fn on_stage<F>(mut self, stage: impl Into<StageName>, handler: F) -> Self
    where
        F: Fn(&DispatchContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.activities.insert(stage.into(), Arc::new(handler));
        self
    }

    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&StageEvent, &DispatchContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Direct predecessors. Normally derived from the dependency graph by
    /// [`PluginList::assemble`](super::PluginList::assemble).
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stage(self, stage: impl Into<StageName>) -> Self {
        self.set_stage(stage.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn stage(&self) -> StageName {
        self.stage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_stage(&self, stage: StageName) {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    pub fn handler(&self, stage: &StageName) -> Option<&StageHandler> {
        self.activities.get(stage)
    }

    pub fn listener(&self) -> Option<&EventListener> {
        self.listener.as_ref()
    }

    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<String>) {
        self.dependencies = dependencies;
    }
}

impl fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContainer")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("stage", &self.stage())
            .field("activities", &self.activities.keys().collect::<Vec<_>>())
            .field("listener", &self.listener.is_some())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
