use serde::Serialize;
use stagehand_core::config::LoaderConfig;
use stagehand_core::{ErrorPayload, LoadingList, PluginSorter};

use super::cli::ResolveArgs;
use super::EXIT_LOADING_FAILED;
use crate::error::CliError;
use crate::manifest::Manifest;
use crate::messages;

#[derive(Debug, Serialize)]
struct ResolveOutput<'a> {
    ok: bool,
    order: Vec<&'a str>,
    edges: Vec<(String, String)>,
    errors: Vec<ErrorPayload>,
}

/// Load the manifest and sort it with the configured system plugins.
pub fn sort_manifest(manifest: &Manifest, cfg: &LoaderConfig) -> Result<LoadingList, CliError> {
    let (infos, upstream) = manifest.to_infos();
    let sorter = PluginSorter::new(cfg.system_plugins.iter().cloned());
    sorter
        .sort(&infos, upstream)
        .map_err(|e| CliError::Loader(e.into()))
}

pub fn handle_resolve(args: ResolveArgs, cfg: &LoaderConfig) -> Result<i32, CliError> {
    let manifest = Manifest::load(&args.manifest)?;
    let list = sort_manifest(&manifest, cfg)?;
    let errors = list.errors();

    if args.json {
        let order = list.ids();
        let edges = order
            .iter()
            .flat_map(|id| {
                list.graph
                    .predecessors(id)
                    .into_iter()
                    .map(move |pred| (pred, id.to_string()))
            })
            .collect();
        let output = ResolveOutput {
            ok: errors.is_empty(),
            order,
            edges,
            errors: errors.clone(),
        };
        let json = serde_json::to_string_pretty(&output).map_err(|e| CliError::Command(e.to_string()))?;
        println!("{json}");
    } else if errors.is_empty() {
        for (pos, info) in list.plugins.iter().enumerate() {
            println!("{:>3}. {} {}", pos + 1, info.id, info.version);
        }
    } else {
        eprintln!("Plugin resolution failed:");
        for payload in &errors {
            eprintln!("  - {}", messages::render(payload));
        }
    }

    Ok(if errors.is_empty() { 0 } else { EXIT_LOADING_FAILED })
}
