use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stagehand", version, about = "Resolve and load plugins in dependency order")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResolveArgs {
    /// Plugin manifest (TOML, one [[plugin]] table per plugin).
    #[arg(long, short, default_value = "plugins.toml")]
    pub manifest: PathBuf,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, short, default_value = "plugins.toml")]
    pub manifest: PathBuf,

    #[arg(long)]
    pub json: bool,

    /// Worker permits for parallel stages; overrides config.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Do not draw progress bars.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sort the manifest's plugins and report the order or the errors.
    Resolve(ResolveArgs),
    /// Resolve, then drive every plugin through the demo stage catalog.
    Run(RunArgs),
}
