use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "emulator.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub hostname: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            hostname: "status-light".into(),
        }
    }
}

/// Defaults, then `emulator.toml` in the working directory, then `EMULATOR_*` variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    if Path::new(CONFIG_FILE).exists() {
        let raw = fs::read_to_string(CONFIG_FILE)
            .with_context(|| format!("failed to read {CONFIG_FILE}"))?;
        apply_file(&mut settings, &raw)?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)
        .with_context(|| format!("{CONFIG_FILE} is not valid"))?;
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.bind_addr = v.clone();
    }
    if let Some(v) = file_cfg.get("hostname") {
        settings.hostname = v.clone();
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("EMULATOR_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = var("EMULATOR_HOSTNAME") {
        settings.hostname = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
