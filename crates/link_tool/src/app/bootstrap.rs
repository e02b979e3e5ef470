use std::fs;
use std::path::Path;

use prefab_link::sync::SyncConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::error::{parse_json, ToolError};

const DIRTY_CHECKS_ENV_VAR: &str = "PREFAB_LINK_DIRTY_CHECKS";

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Defaults, then the optional config file, then the environment.
pub(crate) fn load_config(path: Option<&Path>) -> Result<SyncConfig, ToolError> {
    let config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|source| ToolError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let config = parse_json::<SyncConfig>("config", &raw)?;
            info!(path = %path.display(), "sync_config_loaded");
            config
        }
        None => SyncConfig::default(),
    };
    Ok(apply_dirty_checks_override(
        config,
        std::env::var(DIRTY_CHECKS_ENV_VAR).ok(),
    ))
}

fn apply_dirty_checks_override(mut config: SyncConfig, raw: Option<String>) -> SyncConfig {
    let Some(raw) = raw else {
        return config;
    };
    match raw.trim().parse::<f32>() {
        Ok(rate) if rate.is_finite() && rate >= 0.0 => config.dirty_checks_per_second = rate,
        _ => warn!(
            var = DIRTY_CHECKS_ENV_VAR,
            value = %raw,
            "dirty_checks_override_ignored"
        ),
    }
    config
}
