//! Optimistic pre-fill values kept between sessions: the hostname and the last custom status.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};

pub trait StateCache: Send + Sync {
    fn hostname(&self) -> Option<String>;
    fn store_hostname(&self, hostname: &str) -> Result<()>;
    fn custom_status(&self) -> Option<String>;
    fn store_custom_status(&self, status: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_status: Option<String>,
}

#[derive(Default)]
pub struct MemoryCache {
    values: Mutex<CachedValues>,
}

impl MemoryCache {
    pub fn with_values(values: CachedValues) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CachedValues> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateCache for MemoryCache {
    fn hostname(&self) -> Option<String> {
        self.lock().hostname.clone()
    }

    fn store_hostname(&self, hostname: &str) -> Result<()> {
        self.lock().hostname = Some(hostname.to_string());
        Ok(())
    }

    fn custom_status(&self) -> Option<String> {
        self.lock().custom_status.clone()
    }

    fn store_custom_status(&self, status: &str) -> Result<()> {
        self.lock().custom_status = Some(status.to_string());
        Ok(())
    }
}

/// JSON file backed cache. A missing or unreadable file reads as empty.
pub struct FileCache {
    path: PathBuf,
    values: Mutex<CachedValues>,
}

impl FileCache {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_values(&path);
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut CachedValues)) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut values);
        write_values(&self.path, &values)
    }

    fn read(&self) -> CachedValues {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl StateCache for FileCache {
    fn hostname(&self) -> Option<String> {
        self.read().hostname
    }

    fn store_hostname(&self, hostname: &str) -> Result<()> {
        self.update(|values| values.hostname = Some(hostname.to_string()))
    }

    fn custom_status(&self) -> Option<String> {
        self.read().custom_status
    }

    fn store_custom_status(&self, status: &str) -> Result<()> {
        self.update(|values| values.custom_status = Some(status.to_string()))
    }
}

fn read_values(path: &Path) -> CachedValues {
    let Ok(raw) = fs::read_to_string(path) else {
        return CachedValues::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|error| {
        debug!(path = %path.display(), %error, "ignoring unreadable cache file");
        CachedValues::default()
    })
}

fn write_values(path: &Path, values: &CachedValues) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ClientError::Cache(format!(
                "failed to create cache directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    let raw = serde_json::to_string_pretty(values)
        .map_err(|e| ClientError::Cache(e.to_string()))?;
    fs::write(path, raw).map_err(|e| {
        ClientError::Cache(format!(
            "failed to write cache file '{}': {e}",
            path.display()
        ))
    })
}
