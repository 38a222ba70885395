use std::sync::Arc;

use serde::Serialize;

use crate::error::{LoaderError, TransitionError};
use crate::executor::{submit, Executors};
use crate::plugin::{PluginContainer, PluginList};
use crate::progress::{NoopProgress, ProgressReporter, ProgressSink};
use crate::resolver::LoadingList;
use crate::stage::{LifecycleStage, StageCatalog, StageName};
use crate::transition::{NextStageFn, StageHooks};

/// Outcome of a run that reached the end of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Stages completed, in order.
    pub stages: Vec<StageName>,
    /// Final stage of every plugin, in load order.
    pub plugin_stages: Vec<(String, StageName)>,
}

/// Drives a sorted plugin set through a stage catalog.
pub struct Loader {
    loading_list: LoadingList,
    catalog: StageCatalog,
    plugins: Arc<PluginList>,
    executors: Executors,
    progress: Arc<dyn ProgressReporter>,
    hooks: StageHooks,
}

impl Loader {
    /// Pair the resolver's output with the host's containers.
    ///
    /// Every plugin starts in the catalog's first dispatching stage, with
    /// its predecessors taken from the dependency graph.
    pub fn new(
        loading_list: LoadingList,
        catalog: StageCatalog,
        containers: Vec<PluginContainer>,
        executors: Executors,
    ) -> Self {
        let initial = catalog.first_dispatch_stage();
        let plugins = PluginList::assemble(
            &loading_list.plugins,
            &loading_list.graph,
            containers,
            &initial,
        );

        Self {
            loading_list,
            catalog,
            plugins: Arc::new(plugins),
            executors,
            progress: Arc::new(NoopProgress),
            hooks: StageHooks::default(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_hooks(mut self, hooks: StageHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn plugins(&self) -> &PluginList {
        &self.plugins
    }

    pub fn loading_list(&self) -> &LoadingList {
        &self.loading_list
    }

    /// Run every stage in catalog order, stopping at the first failure.
    ///
    /// A degraded loading list still runs (with only the system plugins) so
    /// the host comes up far enough to show the problem; the run then fails
    /// with the resolution errors.
    #[tracing::instrument(level = "info", skip_all, fields(plugins = self.plugins.len()))]
    pub async fn run(&self) -> Result<LoadReport, LoaderError> {
        let next_stage = self.catalog.next_stage_fn();
        let mut completed = Vec::with_capacity(self.catalog.len());

        if let Some(err) = &self.loading_list.error {
            tracing::error!(error = %err, "loading with system plugins only");
        }

        for stage in self.catalog.iter() {
            let message = stage.message(&self.plugins);
            let units = stage.size(&self.plugins);
            tracing::info!(stage = %stage.name, phase = ?stage.phase, units, "{message}");

            let sink = self.progress.begin(stage.name.as_str(), &message, units);
            let outcome = self.run_stage(stage, sink.clone(), &next_stage).await;
            sink.complete();

            if let Err(err) = outcome {
                tracing::error!(stage = %stage.name, error = %err, "stage failed");
                self.progress.finish(false);
                let mut errors = self.loading_list.errors();
                errors.extend(err.payloads());
                return Err(LoaderError::LoadingFailed { errors });
            }
            completed.push(stage.name.clone());
        }

        if self.loading_list.is_degraded() {
            self.progress.finish(false);
            return Err(LoaderError::LoadingFailed {
                errors: self.loading_list.errors(),
            });
        }

        self.progress.finish(true);
        tracing::info!(stages = completed.len(), "loading complete");
        Ok(LoadReport {
            stages: completed,
            plugin_stages: self.plugins.stages(),
        })
    }

    async fn run_stage(
        &self,
        stage: &LifecycleStage,
        sink: Arc<dyn ProgressSink>,
        next_stage: &NextStageFn,
    ) -> Result<(), TransitionError> {
        if let Some(inline) = &stage.inline {
            let inline = inline.clone();
            let plugins = self.plugins.clone();
            submit(self.executors.sync.as_ref(), move || inline(&plugins))
                .await
                .map_err(|source| TransitionError::ExecutorUnavailable {
                    stage: stage.name.to_string(),
                    source,
                })?
                .map_err(|cause| TransitionError::Hook {
                    stage: stage.name.to_string(),
                    hook: "inline",
                    cause: Arc::new(cause),
                })?;
        }

        if let Some(transition) = &stage.transition {
            transition
                .build(
                    &stage.name,
                    &self.plugins,
                    &self.executors,
                    sink,
                    &self.hooks,
                    next_stage,
                )
                .await?;
        }

        Ok(())
    }
}
