use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::Context;
use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;
use tracing::Instrument;

use crate::error::TransitionError;
use crate::executor::{panic_message, submit, Executor, Executors};
use crate::plugin::{DispatchContext, PluginContainer, PluginList};
use crate::progress::ProgressSink;
use crate::stage::StageName;

use super::aggregate::{gather, to_aggregate_outcome, TaskFailure};
use super::types::{EventGenerator, FinalActivityFn, NextStageFn, StageHooks, StateTransition};

pub type TransitionFuture = BoxFuture<'static, Result<(), TransitionError>>;

type TaskOutcome = Result<(), TaskFailure>;
type SharedTask = Shared<BoxFuture<'static, TaskOutcome>>;

/// Default final activity: once the transition resolves successfully, hop
/// through the sync executor so callers continue after any sync work queued
/// during the stage.
pub fn sync_barrier() -> FinalActivityFn {
    Arc::new(|stage: &StageName, sync: Arc<dyn Executor>, inner: TransitionFuture| {
        let stage = stage.to_string();
        async move {
            inner.await?;
            submit(sync.as_ref(), || ())
                .await
                .map_err(|source| TransitionError::ExecutorUnavailable { stage, source })
        }
        .boxed()
    })
}

/// Everything one plugin task needs, cloned into it.
#[derive(Clone)]
struct TaskEnv {
    stage: StageName,
    executor: Arc<dyn Executor>,
    event: Option<EventGenerator>,
    next_stage: NextStageFn,
    progress: Arc<dyn ProgressSink>,
}

impl StateTransition {
    /// Build the future that dispatches `stage` to every plugin.
    ///
    /// Per-plugin tasks are created immediately, in load order; nothing is
    /// dispatched until the returned future is polled. A plugin naming a
    /// predecessor with no task yields `MissingPredecessor` without
    /// dispatching anything.
    pub fn build(
        &self,
        stage: &StageName,
        plugins: &PluginList,
        executors: &Executors,
        progress: Arc<dyn ProgressSink>,
        hooks: &StageHooks,
        default_next_stage: &NextStageFn,
    ) -> TransitionFuture {
        let env = TaskEnv {
            stage: stage.clone(),
            executor: self.selector.select(executors),
            event: self.event.clone(),
            next_stage: self
                .next_stage
                .clone()
                .unwrap_or_else(|| default_next_stage.clone()),
            progress: progress.clone(),
        };

        let tasks = match build_tasks(plugins, &env) {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::error!(error = %err, "transition aborted before dispatch");
                return future::ready(Err(err)).boxed();
            }
        };

        tracing::debug!(
            stage = %stage,
            executor = env.executor.name(),
            plugins = tasks.len(),
            "transition planned"
        );

        let sync = executors.sync.clone();
        let pre = hooks.pre.clone();
        let post = hooks.post.clone();
        let label = format!("{}: dispatching {}", progress.name(), stage);
        let stage_name = stage.to_string();

        let sequence = {
            let sync = sync.clone();
            async move {
                if let Some(pre) = pre {
                    pre(sync.clone()).await.map_err(|cause| TransitionError::Hook {
                        stage: stage_name.clone(),
                        hook: "pre",
                        cause: Arc::new(cause),
                    })?;
                }

                progress.set_label(&label);
                let results = gather(tasks).await;
                to_aggregate_outcome(results).map_err(|source| {
                    tracing::error!(stage = %stage_name, error = %source, "transition failed");
                    TransitionError::Aggregate {
                        stage: stage_name.clone(),
                        source,
                    }
                })?;

                if let Some(post) = post {
                    post(sync).await.map_err(|cause| TransitionError::Hook {
                        stage: stage_name.clone(),
                        hook: "post",
                        cause: Arc::new(cause),
                    })?;
                }
                Ok(())
            }
        }
        .instrument(tracing::info_span!("transition", stage = %stage))
        .boxed();

        let final_activity = self.final_activity.clone().unwrap_or_else(sync_barrier);
        final_activity(stage, sync, sequence)
    }
}

fn build_tasks(plugins: &PluginList, env: &TaskEnv) -> Result<Vec<SharedTask>, TransitionError> {
    let mut by_id: HashMap<&str, SharedTask> = HashMap::with_capacity(plugins.len());
    let mut tasks = Vec::with_capacity(plugins.len());

    for container in plugins.iter() {
        let predecessors = container
            .dependencies()
            .iter()
            .map(|dep| {
                by_id
                    .get(dep.as_str())
                    .map(|task| (dep.clone(), task.clone()))
                    .ok_or_else(|| TransitionError::MissingPredecessor {
                        stage: env.stage.to_string(),
                        plugin: container.id().to_string(),
                        dependency: dep.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let task = plugin_task(container.clone(), predecessors, env.clone())
            .boxed()
            .shared();
        by_id.insert(container.id(), task.clone());
        tasks.push(task);
    }

    Ok(tasks)
}

async fn plugin_task(
    container: Arc<PluginContainer>,
    predecessors: Vec<(String, SharedTask)>,
    env: TaskEnv,
) -> TaskOutcome {
    let (names, waits): (Vec<String>, Vec<SharedTask>) = predecessors.into_iter().unzip();
    let upstream = names
        .into_iter()
        .zip(gather(waits).await)
        .find_map(|(dependency, outcome)| outcome.err().map(|failure| (dependency, failure)));

    if let Some((dependency, failure)) = upstream {
        advance(&container, &env, true);
        tracing::debug!(
            plugin = container.id(),
            dependency = %dependency,
            stage = %env.stage,
            "skipped: dependency failed"
        );
        return Err(TaskFailure::Upstream {
            plugin: container.id().to_string(),
            dependency,
            cause: failure.cause().clone(),
        });
    }

    let work = {
        let container = container.clone();
        let env = env.clone();
        move || {
            let outcome = dispatch(&container, env.event.as_ref());
            advance(&container, &env, outcome.is_err());
            outcome
        }
    };

    let failure = match submit(env.executor.as_ref(), work).await {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(cause)) => cause,
        Err(task_error) => {
            // The work never finished, so the stage was not advanced.
            advance(&container, &env, true);
            anyhow::Error::new(task_error).context(format!(
                "plugin '{}' could not run stage '{}'",
                container.id(),
                env.stage
            ))
        }
    };

    tracing::debug!(plugin = container.id(), stage = %env.stage, error = %failure, "plugin failed");
    Err(TaskFailure::Failed {
        plugin: container.id().to_string(),
        cause: Arc::new(failure),
    })
}

/// Run the plugin's handler for its current stage, then deliver the event.
fn dispatch(container: &PluginContainer, event: Option<&EventGenerator>) -> anyhow::Result<()> {
    let stage = container.stage();
    let ctx = DispatchContext {
        plugin: container.id().to_string(),
        stage: stage.clone(),
    };

    if let Some(handler) = container.handler(&stage) {
        guarded(|| handler(&ctx))
            .with_context(|| format!("plugin '{}' failed during stage '{}'", ctx.plugin, stage))?;
    }

    if let Some(event) = event {
        let event = event(container, &stage);
        if let Some(listener) = container.listener() {
            guarded(|| listener(&event, &ctx)).with_context(|| {
                format!("plugin '{}' failed handling event '{}'", ctx.plugin, event.kind)
            })?;
        }
    }

    Ok(())
}

fn guarded(f: impl FnOnce() -> anyhow::Result<()>) -> anyhow::Result<()> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref()))))
}

fn advance(container: &PluginContainer, env: &TaskEnv, failed: bool) {
    let next = (env.next_stage)(&container.stage(), failed);
    container.set_stage(next);
    env.progress.increment();
}
