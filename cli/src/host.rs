//! Demo host: the stage catalog and per-plugin behaviour the `run` command
//! drives. Plugins come from the manifest; their handlers only sleep and,
//! when told to, fail.

use std::time::Duration;

use stagehand_core::error::CatalogError;
use stagehand_core::{
    LifecycleStage, Phase, PluginContainer, PluginInfo, StageCatalog, StateTransition,
};

use crate::manifest::Manifest;

/// Stages that dispatch to every plugin, in order.
pub const DISPATCH_STAGES: &[&str] = &[
    "construct",
    "common_setup",
    "sided_setup",
    "enqueue_imc",
    "process_imc",
    "complete",
];

pub fn catalog() -> Result<StageCatalog, CatalogError> {
    StageCatalog::new(vec![
        LifecycleStage::builder("construct", Phase::Gather)
            .with_transition(StateTransition::parallel().with_event_kind("construct")),
        LifecycleStage::builder("config_load", Phase::Gather)
            .after("construct")
            .with_inline(|plugins| {
                tracing::info!(plugins = plugins.len(), "loading plugin configs");
                Ok(())
            }),
        LifecycleStage::builder("common_setup", Phase::Load)
            .after("config_load")
            .with_transition(StateTransition::parallel().with_event_kind("common_setup")),
        LifecycleStage::builder("sided_setup", Phase::Load)
            .after("common_setup")
            .with_transition(StateTransition::parallel().with_event_kind("sided_setup")),
        LifecycleStage::builder("enqueue_imc", Phase::Load)
            .after("sided_setup")
            .with_transition(StateTransition::sync().with_event_kind("enqueue_imc")),
        LifecycleStage::builder("process_imc", Phase::Load)
            .after("enqueue_imc")
            .with_transition(StateTransition::sync().with_event_kind("process_imc")),
        LifecycleStage::builder("complete", Phase::Complete)
            .after("process_imc")
            .with_transition(StateTransition::parallel().with_event_kind("load_complete")),
        LifecycleStage::builder("freeze", Phase::Complete)
            .after("complete")
            .with_inline(|_| {
                tracing::info!("freezing registries");
                Ok(())
            }),
        LifecycleStage::builder("done", Phase::Done)
            .after("freeze")
            .message(|_| "Loading finished".to_string())
            .empty(),
    ])
}

/// One container per plugin, with a handler for every dispatching stage.
pub fn containers(infos: &[PluginInfo], manifest: &Manifest) -> Vec<PluginContainer> {
    infos
        .iter()
        .map(|info| {
            let entry = manifest.entry(&info.id);
            let delay = Duration::from_millis(entry.map(|e| e.delay_ms).unwrap_or(0));
            let fail_at = entry.and_then(|e| e.fail_at.clone());

            let container = DISPATCH_STAGES.iter().fold(
                PluginContainer::new(info.id.clone(), info.version.clone()),
                |container, &stage| {
                    let fail = fail_at.as_deref() == Some(stage);
                    container.on_stage(stage, move |ctx| {
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                        if fail {
                            anyhow::bail!("{} was told to fail at {}", ctx.plugin, ctx.stage);
                        }
                        Ok(())
                    })
                },
            );

            container.with_listener(|event, ctx| {
                tracing::debug!(plugin = %ctx.plugin, event = %event.kind, "event delivered");
                Ok(())
            })
        })
        .collect()
}
