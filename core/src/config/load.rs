use std::path::{Path, PathBuf};

use super::types::LoaderConfig;

const CONFIG_FILE: &str = "config.toml";
const LOCAL_CONFIG_FILE: &str = "stagehand.toml";

/// Get the default stagehand data directory: ~/.stagehand
pub fn get_stagehand_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".stagehand"))
}

pub fn load_default() -> anyhow::Result<LoaderConfig> {
    let data_dir = get_stagehand_data_dir()?;
    load_from(&data_dir, Path::new("."), |key| std::env::var(key).ok())
}

/// Load config with explicit locations and environment.
///
/// Priority: `<data_dir>/config.toml`, then `<cwd>/stagehand.toml`, then
/// defaults. Environment overrides apply on top of whichever was used.
pub fn load_from(
    data_dir: &Path,
    cwd: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<LoaderConfig> {
    let user_config = data_dir.join(CONFIG_FILE);
    let local_config = cwd.join(LOCAL_CONFIG_FILE);

    let mut cfg: LoaderConfig = if user_config.exists() {
        let s = std::fs::read_to_string(&user_config)?;
        toml::from_str::<LoaderConfig>(&s)?
    } else if local_config.exists() {
        let s = std::fs::read_to_string(&local_config)?;
        toml::from_str::<LoaderConfig>(&s)?
    } else {
        LoaderConfig::default()
    };

    // Default log directory lives under the data directory
    if cfg.logging.file
        && cfg
            .logging
            .directory
            .as_ref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    {
        let logs_dir = data_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    // Environment variable overrides (highest priority)
    if let Some(v) = env("STAGEHAND_PARALLEL_THREADS") {
        let v = v.trim();
        if !v.is_empty() {
            let threads: usize = v
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid STAGEHAND_PARALLEL_THREADS '{v}': {e}"))?;
            cfg.executor.parallel_threads = Some(threads);
        }
    }

    if let Some(v) = env("STAGEHAND_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }

    Ok(cfg)
}
