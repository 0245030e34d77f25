use std::sync::{Mutex, MutexGuard};

use crate::device::Device;

pub struct AppState {
    device: Mutex<Device>,
    hostname: String,
}

impl AppState {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self::with_device(hostname, Device::default())
    }

    pub fn with_device(hostname: impl Into<String>, device: Device) -> Self {
        Self {
            device: Mutex::new(device),
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn device(&self) -> MutexGuard<'_, Device> {
        self.device
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
