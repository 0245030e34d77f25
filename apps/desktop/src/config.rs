use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::SessionConfig;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "lightctl.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub device_url: String,
    /// `None` keeps cached values in memory only.
    pub cache_path: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
    pub color_window_ms: u64,
    pub custom_status_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_url: "http://status-light.local".into(),
            cache_path: dirs::cache_dir().map(|dir| dir.join("lightctl").join("cache.json")),
            poll_interval_secs: None,
            color_window_ms: 250,
            custom_status_delay_ms: 500,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            color_window: Duration::from_millis(self.color_window_ms),
            custom_status_delay: Duration::from_millis(self.custom_status_delay_ms),
            poll_interval: self
                .poll_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    device_url: Option<String>,
    cache_path: Option<PathBuf>,
    poll_interval_secs: Option<u64>,
    color_window_ms: Option<u64>,
    custom_status_delay_ms: Option<u64>,
}

/// Defaults, then the config file, then `LIGHT_*` variables. An explicit `path` must exist;
/// the default `lightctl.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(CONFIG_FILE), false),
    };
    if required || path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.device_url {
        settings.device_url = v;
    }
    if let Some(v) = file_cfg.cache_path {
        settings.cache_path = Some(v);
    }
    if let Some(v) = file_cfg.poll_interval_secs {
        settings.poll_interval_secs = Some(v);
    }
    if let Some(v) = file_cfg.color_window_ms {
        settings.color_window_ms = v;
    }
    if let Some(v) = file_cfg.custom_status_delay_ms {
        settings.custom_status_delay_ms = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = var("LIGHT_DEVICE_URL").filter(|v| !v.trim().is_empty()) {
        settings.device_url = v;
    }
    if let Some(v) = var("LIGHT_CACHE_PATH").filter(|v| !v.trim().is_empty()) {
        settings.cache_path = Some(PathBuf::from(v));
    }
    if let Some(v) = var("LIGHT_POLL_INTERVAL_SECS") {
        let secs = v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("LIGHT_POLL_INTERVAL_SECS must be a number, got '{v}'"))?;
        settings.poll_interval_secs = Some(secs);
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
