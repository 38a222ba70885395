use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

use crate::executor::{submit, Executor, Executors};
use crate::plugin::PluginContainer;
use crate::stage::StageName;

use super::engine::TransitionFuture;

/// Which executor a transition dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadSelector {
    Sync,
    #[default]
    Parallel,
}

impl ThreadSelector {
    pub fn select(self, executors: &Executors) -> Arc<dyn Executor> {
        match self {
            Self::Sync => executors.sync.clone(),
            Self::Parallel => executors.parallel.clone(),
        }
    }
}

/// Event delivered to a plugin's listener during a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEvent {
    pub kind: String,
    pub stage: StageName,
    pub plugin: String,
}

impl StageEvent {
    pub fn new(kind: impl Into<String>, stage: StageName, plugin: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            stage,
            plugin: plugin.into(),
        }
    }
}

pub type EventGenerator = Arc<dyn Fn(&PluginContainer, &StageName) -> StageEvent + Send + Sync>;

/// `(current, failed) -> next`
pub type NextStageFn = Arc<dyn Fn(&StageName, bool) -> StageName + Send + Sync>;

/// Wraps the whole transition; receives the stage, the sync executor and
/// the transition future.
pub type FinalActivityFn =
    Arc<dyn Fn(&StageName, Arc<dyn Executor>, TransitionFuture) -> TransitionFuture + Send + Sync>;

/// Work run before or after dispatch. Receives the sync executor.
pub type StageHook = Arc<dyn Fn(Arc<dyn Executor>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Pre- and post-dispatch work shared by every transition of a run.
#[derive(Clone, Default)]
pub struct StageHooks {
    pub pre: Option<StageHook>,
    pub post: Option<StageHook>,
}

impl StageHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` on the sync executor before dispatch.
    pub fn pre_sync<F>(mut self, work: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pre = Some(on_sync(work));
        self
    }

    /// Run `work` on the sync executor after a successful dispatch.
    pub fn post_sync<F>(mut self, work: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.post = Some(on_sync(work));
        self
    }
}

fn on_sync<F>(work: F) -> StageHook
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    let work = Arc::new(work);
    Arc::new(move |sync: Arc<dyn Executor>| {
        let work = work.clone();
        submit(sync.as_ref(), move || work())
            .map(|outcome| outcome.map_err(anyhow::Error::from).and_then(|r| r))
            .boxed()
    })
}

impl fmt::Debug for StageHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageHooks")
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .finish()
    }
}

/// How a stage is dispatched to plugins.
///
/// Unset `next_stage` falls back to the catalog's mapping; unset
/// `final_activity` falls back to [`sync_barrier`](super::sync_barrier).
#[derive(Clone, Default)]
pub struct StateTransition {
    pub selector: ThreadSelector,
    pub event: Option<EventGenerator>,
    pub next_stage: Option<NextStageFn>,
    pub final_activity: Option<FinalActivityFn>,
}

impl StateTransition {
    pub fn sync() -> Self {
        Self {
            selector: ThreadSelector::Sync,
            ..Self::default()
        }
    }

    pub fn parallel() -> Self {
        Self::default()
    }

    pub fn with_event<F>(mut self, event: F) -> Self
    where
        F: Fn(&PluginContainer, &StageName) -> StageEvent + Send + Sync + 'static,
    {
        self.event = Some(Arc::new(event));
        self
    }

    /// Deliver a `kind` event carrying the plugin id and stage.
    pub fn with_event_kind(self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.with_event(move |container, stage| {
            StageEvent::new(kind.clone(), stage.clone(), container.id())
        })
    }

    pub fn with_next_stage<F>(mut self, next: F) -> Self
    where
        F: Fn(&StageName, bool) -> StageName + Send + Sync + 'static,
    {
        self.next_stage = Some(Arc::new(next));
        self
    }

    pub fn with_final_activity<F>(mut self, activity: F) -> Self
    where
        F: Fn(&StageName, Arc<dyn Executor>, TransitionFuture) -> TransitionFuture
            + Send
            + Sync
            + 'static,
    {
        self.final_activity = Some(Arc::new(activity));
        self
    }
}

impl fmt::Debug for StateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTransition")
            .field("selector", &self.selector)
            .field("event", &self.event.is_some())
            .field("next_stage", &self.next_stage.is_some())
            .field("final_activity", &self.final_activity.is_some())
            .finish()
    }
}
