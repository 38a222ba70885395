use serde::{Deserialize, Serialize};

use crate::resolver::DEFAULT_SYSTEM_PLUGINS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    /// Plugins that must be present. A successful sort orders them like any
    /// other plugin; when resolution falls back they are the whole load
    /// order, in this order.
    #[serde(default = "default_system_plugins")]
    pub system_plugins: Vec<String>,
}

fn default_system_plugins() -> Vec<String> {
    DEFAULT_SYSTEM_PLUGINS.iter().map(|s| s.to_string()).collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            executor: ExecutorConfig::default(),
            progress: ProgressConfig::default(),
            system_plugins: default_system_plugins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "stagehand_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Worker permits for parallel transitions. Unset means one per CPU.
    #[serde(default)]
    pub parallel_threads: Option<usize>,

    #[serde(default = "default_sync_thread_name")]
    pub sync_thread_name: String,
}

fn default_sync_thread_name() -> String {
    "stagehand-sync".to_string()
}

impl ExecutorConfig {
    pub fn threads(&self) -> usize {
        self.parallel_threads
            .filter(|&n| n > 0)
            .unwrap_or_else(num_cpus::get)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel_threads: None,
            sync_thread_name: default_sync_thread_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_progress_enabled")]
    pub enabled: bool,
}

fn default_progress_enabled() -> bool {
    true
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: default_progress_enabled(),
        }
    }
}
