mod common;

use std::sync::{Arc, Mutex};

use common::{executors, SYNC_THREAD};
use pretty_assertions::assert_eq;
use stagehand_core::error::keys;
use stagehand_core::{
    LifecycleStage, Loader, LoaderError, NoopProgress, Phase, PluginContainer, PluginInfo,
    PluginSorter, ProgressReporter, ProgressSink, StageCatalog, StageName, StateTransition,
};

type Log = Arc<Mutex<Vec<(String, String)>>>;

fn catalog(inline_threads: Arc<Mutex<Vec<Option<String>>>>) -> StageCatalog {
    StageCatalog::new(vec![
        LifecycleStage::builder("construct", Phase::Gather)
            .with_transition(StateTransition::parallel().with_event_kind("construct")),
        LifecycleStage::builder("config", Phase::Gather)
            .after("construct")
            .with_inline(move |_| {
                let name = std::thread::current().name().map(str::to_string);
                inline_threads.lock().unwrap().push(name);
                Ok(())
            }),
        LifecycleStage::builder("setup", Phase::Load)
            .after("config")
            .with_transition(StateTransition::sync()),
        LifecycleStage::builder("done", Phase::Done).after("setup").empty(),
    ])
    .unwrap()
}

fn plugins() -> Vec<PluginInfo> {
    vec![
        PluginInfo::new("minecraft", "1.20.1"),
        PluginInfo::new("forge", "47"),
        PluginInfo::new("b", "1").after("a"),
        PluginInfo::new("a", "1").after("forge"),
    ]
}

fn containers(
    infos: &[PluginInfo],
    log: &Log,
    fail: Option<(&'static str, &'static str)>,
) -> Vec<PluginContainer> {
    infos
        .iter()
        .map(|info| {
            ["construct", "setup"].into_iter().fold(
                PluginContainer::new(info.id.clone(), info.version.clone()),
                |container, stage| {
                    let log = log.clone();
                    let should_fail = fail.is_some_and(|(id, at)| id == info.id && at == stage);
                    container.on_stage(stage, move |ctx| {
                        log.lock()
                            .unwrap()
                            .push((ctx.plugin.clone(), ctx.stage.to_string()));
                        if should_fail {
                            anyhow::bail!("{} refused {}", ctx.plugin, ctx.stage);
                        }
                        Ok(())
                    })
                },
            )
        })
        .collect()
}

fn position(log: &[(String, String)], plugin: &str, stage: &str) -> usize {
    log.iter()
        .position(|(p, s)| p == plugin && s == stage)
        .unwrap_or_else(|| panic!("{plugin} never ran {stage}"))
}

#[derive(Default)]
struct RecordingReporter {
    begun: Mutex<Vec<(String, String, usize)>>,
    finished: Mutex<Option<bool>>,
}

impl ProgressReporter for RecordingReporter {
    fn begin(&self, stage: &str, message: &str, units: usize) -> Arc<dyn ProgressSink> {
        self.begun
            .lock()
            .unwrap()
            .push((stage.to_string(), message.to_string(), units));
        Arc::new(NoopProgress)
    }

    fn finish(&self, success: bool) {
        *self.finished.lock().unwrap() = Some(success);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_run_reaches_terminal_stage_in_dependency_order() {
    let infos = plugins();
    let list = PluginSorter::default().sort(&infos, Vec::new()).unwrap();
    assert_eq!(list.ids(), vec!["minecraft", "forge", "a", "b"]);

    let log: Log = Arc::default();
    let inline_threads = Arc::new(Mutex::new(Vec::new()));
    let reporter = Arc::new(RecordingReporter::default());

    let loader = Loader::new(
        list,
        catalog(inline_threads.clone()),
        containers(&infos, &log, None),
        executors(),
    )
    .with_progress(reporter.clone());

    let report = loader.run().await.unwrap();

    let stages: Vec<&str> = report.stages.iter().map(StageName::as_str).collect();
    assert_eq!(stages, vec!["construct", "config", "setup", "done"]);
    assert!(report.plugin_stages.iter().all(|(_, stage)| stage.as_str() == "done"));

    let log = log.lock().unwrap();
    for stage in ["construct", "setup"] {
        assert!(position(&log, "forge", stage) < position(&log, "a", stage));
        assert!(position(&log, "a", stage) < position(&log, "b", stage));
    }
    // Every plugin finishes construct before anyone starts setup.
    assert!(position(&log, "b", "construct") < position(&log, "minecraft", "setup"));

    assert_eq!(*inline_threads.lock().unwrap(), vec![Some(SYNC_THREAD.to_string())]);

    let begun = reporter.begun.lock().unwrap();
    assert_eq!(begun.len(), 4);
    assert_eq!(
        begun[0],
        ("construct".to_string(), "Processing transition construct".to_string(), 4)
    );
    assert_eq!(begun[1].1, "Processing work config");
    assert_eq!(begun[3], ("done".to_string(), String::new(), 0));
    assert_eq!(*reporter.finished.lock().unwrap(), Some(true));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_stage_stops_the_pipeline() {
    let infos = plugins();
    let list = PluginSorter::default().sort(&infos, Vec::new()).unwrap();
    let log: Log = Arc::default();

    let loader = Loader::new(
        list,
        catalog(Arc::default()),
        containers(&infos, &log, Some(("a", "construct"))),
        executors(),
    );

    let Err(LoaderError::LoadingFailed { errors }) = loader.run().await else {
        panic!("expected loading to fail");
    };

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, keys::STAGE_FAILED);
    assert_eq!(errors[0].args[0], "construct");
    assert!(errors[0].args[1].contains("a refused construct"));

    let log = log.lock().unwrap();
    assert!(log.iter().all(|(_, stage)| stage == "construct"));
    assert!(!log.iter().any(|(plugin, _)| plugin == "b"));

    assert_eq!(loader.plugins().get("a").unwrap().stage(), StageName::error());
    assert_eq!(loader.plugins().get("b").unwrap().stage(), StageName::error());
    assert_eq!(loader.plugins().get("forge").unwrap().stage().as_str(), "setup");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn degraded_list_runs_system_plugins_then_reports() {
    let infos = vec![
        PluginInfo::new("minecraft", "1.20.1"),
        PluginInfo::new("forge", "47"),
        PluginInfo::new("x", "1").before("y"),
        PluginInfo::new("y", "1").before("x"),
    ];
    let list = PluginSorter::default().sort(&infos, Vec::new()).unwrap();
    assert!(list.is_degraded());

    let log: Log = Arc::default();
    let loader = Loader::new(
        list,
        catalog(Arc::default()),
        containers(&infos, &log, None),
        executors(),
    );

    let Err(LoaderError::LoadingFailed { errors }) = loader.run().await else {
        panic!("expected loading to fail");
    };
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.key == keys::CYCLE));

    assert_eq!(loader.plugins().ids(), vec!["minecraft", "forge"]);
    assert!(log
        .lock()
        .unwrap()
        .iter()
        .all(|(plugin, _)| plugin == "minecraft" || plugin == "forge"));
    assert_eq!(
        loader.plugins().get("forge").unwrap().stage().as_str(),
        "done"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_inline_work_is_reported() {
    let infos = plugins();
    let list = PluginSorter::default().sort(&infos, Vec::new()).unwrap();
    let catalog = StageCatalog::new(vec![
        LifecycleStage::builder("construct", Phase::Gather)
            .with_transition(StateTransition::parallel()),
        LifecycleStage::builder("freeze", Phase::Complete)
            .after("construct")
            .with_inline(|_| anyhow::bail!("registry locked")),
    ])
    .unwrap();

    let loader = Loader::new(list, catalog, Vec::new(), executors());
    let Err(LoaderError::LoadingFailed { errors }) = loader.run().await else {
        panic!("expected loading to fail");
    };
    assert_eq!(errors[0].key, keys::STAGE_FAILED);
    assert_eq!(errors[0].args[0], "freeze");
    assert!(errors[0].args[1].contains("registry locked"));
}
