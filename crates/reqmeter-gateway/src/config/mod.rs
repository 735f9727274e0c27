//! Gateway config loader (strict parsing + environment overrides).

pub mod schema;

use std::fs;
use std::path::Path;

use crate::error::{GatewayError, Result};

pub use schema::{GatewayConfig, GatewaySection, LogSinkSection, MetricsSection, RouteLabel};

/// Env var naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "REQMETER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "reqmeter.yaml";

pub fn load_from_file(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        GatewayError::BadRequest(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| GatewayError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Startup entry: YAML file if present (defaults otherwise), then the
/// log-sink environment overrides, then validation.
pub fn load() -> Result<GatewayConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut cfg = if Path::new(&path).exists() {
        load_from_file(&path)?
    } else {
        tracing::debug!(%path, "no config file, using defaults");
        GatewayConfig::default()
    };
    apply_env(&mut cfg, |k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Override the log sink from `LOG_SINK_HOST` (or `MY_HOST`) and `LOG_SINK_PORT`.
pub fn apply_env(cfg: &mut GatewayConfig, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(host) = var("LOG_SINK_HOST").or_else(|| var("MY_HOST")) {
        cfg.log_sink.host = host;
    }
    if let Some(port) = var("LOG_SINK_PORT") {
        cfg.log_sink.port = port
            .trim()
            .parse()
            .map_err(|e| GatewayError::BadRequest(format!("LOG_SINK_PORT {port:?}: {e}")))?;
    }
    Ok(())
}
