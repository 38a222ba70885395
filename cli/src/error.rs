use stagehand_core::LoaderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("manifest error: {0}")]
    Manifest(String),
    #[error("loader failed: {0}")]
    Loader(#[from] LoaderError),
    #[error("command failed: {0}")]
    Command(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        // 0: success
        // 11: config error
        // 12: manifest error
        // 20: executor start / command error
        // 30: loading failed (normally reported by the command itself)
        // 50: internal/uncategorized
        match self {
            CliError::Config(_) => 11,
            CliError::Manifest(_) => 12,
            CliError::Loader(le) => match le {
                LoaderError::LoadingFailed { .. } | LoaderError::Resolve(_) => 30,
                LoaderError::Executor(_) => 20,
                LoaderError::Catalog(_) | LoaderError::Transition(_) => 50,
            },
            CliError::Command(_) => 20,
        }
    }
}
