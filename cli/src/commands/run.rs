use std::sync::Arc;

use serde::Serialize;
use stagehand_core::config::LoaderConfig;
use stagehand_core::{
    ErrorPayload, Executors, LoadReport, Loader, LoaderError, NoopProgress, ProgressMonitor,
    ProgressReporter,
};
use tokio::runtime::Handle;

use super::cli::RunArgs;
use super::resolve::sort_manifest;
use super::EXIT_LOADING_FAILED;
use crate::error::CliError;
use crate::host;
use crate::manifest::Manifest;
use crate::messages;

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RunOutput {
    Loaded { ok: bool, report: LoadReport },
    Failed { ok: bool, errors: Vec<ErrorPayload> },
}

pub async fn handle_run(args: RunArgs, cfg: &LoaderConfig) -> Result<i32, CliError> {
    let manifest = Manifest::load(&args.manifest)?;
    let list = sort_manifest(&manifest, cfg)?;
    let containers = host::containers(&list.plugins, &manifest);
    let catalog = host::catalog().map_err(LoaderError::from)?;

    let mut executor_cfg = cfg.executor.clone();
    if let Some(threads) = args.threads {
        executor_cfg.parallel_threads = Some(threads);
    }
    let executors = Executors::start(&executor_cfg, Handle::current()).map_err(LoaderError::from)?;

    let show_progress =
        cfg.progress.enabled && !args.no_progress && !args.json && atty::is(atty::Stream::Stderr);
    let progress: Arc<dyn ProgressReporter> = if show_progress {
        Arc::new(ProgressMonitor::new(catalog.len(), true))
    } else {
        Arc::new(NoopProgress)
    };

    let loader = Loader::new(list, catalog, containers, executors).with_progress(progress);

    match loader.run().await {
        Ok(report) => {
            if args.json {
                print_json(&RunOutput::Loaded { ok: true, report })?;
            } else {
                println!("Loaded {} plugin(s) through {} stage(s)", report.plugin_stages.len(), report.stages.len());
                for (plugin, stage) in &report.plugin_stages {
                    println!("  {plugin}: {stage}");
                }
            }
            Ok(0)
        }
        Err(LoaderError::LoadingFailed { errors }) => {
            if args.json {
                print_json(&RunOutput::Failed { ok: false, errors })?;
            } else {
                eprintln!("Loading failed:");
                for payload in &errors {
                    eprintln!("  - {}", messages::render(payload));
                }
            }
            Ok(EXIT_LOADING_FAILED)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::Command(e.to_string()))?;
    println!("{json}");
    Ok(())
}
