use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::plugin::PluginList;
use crate::transition::StateTransition;

/// Name of a lifecycle stage. Plugins report the stage they are in by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StageName(String);

impl StageName {
    const ERROR: &'static str = "error";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Where a plugin lands after a failed transition.
    pub fn error() -> Self {
        Self(Self::ERROR.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.0 == Self::ERROR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StageName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for StageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Coarse grouping of stages, used by hosts for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Error,
    Gather,
    Load,
    Complete,
    Done,
}

pub type MessageFn = Arc<dyn Fn(&PluginList) -> String + Send + Sync>;
pub type SizeFn = Arc<dyn Fn(&PluginList) -> usize + Send + Sync>;
pub type InlineFn = Arc<dyn Fn(&PluginList) -> anyhow::Result<()> + Send + Sync>;

/// One stage of the lifecycle.
///
/// `message` and `size` are evaluated when the stage is reached, against the
/// plugin list as it is then.
#[derive(Clone)]
pub struct LifecycleStage {
    pub name: StageName,
    pub previous: Option<StageName>,
    pub phase: Phase,
    pub message: MessageFn,
    pub size: SizeFn,
    pub inline: Option<InlineFn>,
    pub transition: Option<StateTransition>,
}

impl LifecycleStage {
    pub fn builder(name: impl Into<StageName>, phase: Phase) -> StageBuilder {
        StageBuilder {
            name: name.into(),
            previous: None,
            phase,
            message: None,
            size: None,
        }
    }

    pub fn message(&self, plugins: &PluginList) -> String {
        (self.message)(plugins)
    }

    pub fn size(&self, plugins: &PluginList) -> usize {
        (self.size)(plugins)
    }
}

impl fmt::Debug for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleStage")
            .field("name", &self.name)
            .field("previous", &self.previous)
            .field("phase", &self.phase)
            .field("inline", &self.inline.is_some())
            .field("transition", &self.transition.is_some())
            .finish()
    }
}

pub struct StageBuilder {
    name: StageName,
    previous: Option<StageName>,
    phase: Phase,
    message: Option<MessageFn>,
    size: Option<SizeFn>,
}

impl StageBuilder {
    pub fn after(mut self, previous: impl Into<StageName>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    pub fn message<F>(mut self, message: F) -> Self
    where
        F: Fn(&PluginList) -> String + Send + Sync + 'static,
    {
        self.message = Some(Arc::new(message));
        self
    }

    pub fn size<F>(mut self, size: F) -> Self
    where
        F: Fn(&PluginList) -> usize + Send + Sync + 'static,
    {
        self.size = Some(Arc::new(size));
        self
    }

    /// A stage with no work. Message defaults to empty, size to 0.
    pub fn empty(self) -> LifecycleStage {
        self.finish(|_| String::new(), |_| 0, None, None)
    }

    /// A stage that dispatches `transition` to every plugin.
    /// Message defaults to `Processing transition <name>`, size to the plugin count.
    pub fn with_transition(self, transition: StateTransition) -> LifecycleStage {
        let text = format!("Processing transition {}", self.name);
        self.finish(move |_| text.clone(), PluginList::len, None, Some(transition))
    }

    /// A stage that runs `work` once on the sync executor.
    /// Message defaults to `Processing work <name>`, size to 0.
    pub fn with_inline<F>(self, work: F) -> LifecycleStage
    where
        F: Fn(&PluginList) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let text = format!("Processing work {}", self.name);
        self.finish(move |_| text.clone(), |_| 0, Some(Arc::new(work)), None)
    }

    fn finish<M, S>(
        self,
        default_message: M,
        default_size: S,
        inline: Option<InlineFn>,
        transition: Option<StateTransition>,
    ) -> LifecycleStage
    where
        M: Fn(&PluginList) -> String + Send + Sync + 'static,
        S: Fn(&PluginList) -> usize + Send + Sync + 'static,
    {
        LifecycleStage {
            name: self.name,
            previous: self.previous,
            phase: self.phase,
            message: self.message.unwrap_or_else(|| Arc::new(default_message)),
            size: self.size.unwrap_or_else(|| Arc::new(default_size)),
            inline,
            transition,
        }
    }
}
