use serde::{Deserialize, Serialize};

use crate::domain::{Color, DeviceState, Mode, Status};

pub fn state_route() -> &'static str {
    "/config/state"
}

pub fn config_route() -> &'static str {
    "/config"
}

pub fn hostname_route() -> &'static str {
    "/hostname"
}

/// Device state as returned by `GET /config/state` and `POST /config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_num: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl StateSnapshot {
    /// Overlays every field present in the snapshot onto `state`.
    pub fn merge_into(&self, state: &mut DeviceState) {
        if let Some(color) = self.color {
            state.color = Some(color);
        }
        if let Some(mode_num) = self.mode_num {
            state.mode_num = Some(mode_num);
        }
        if let Some(mode) = self.mode {
            state.mode = Some(mode);
        }
        if let Some(brightness) = self.brightness {
            state.brightness = Some(brightness);
        }
        if let Some(speed) = self.speed {
            state.speed = Some(speed);
        }
        if let Some(status) = &self.status {
            state.status = Some(status.clone());
        }
    }
}

/// Body of `POST /config`. Numeric fields are signed and wide so the device can clamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[i64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_num: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ConfigCommand {
    pub fn color(color: Color) -> Self {
        Self {
            color: Some([
                i64::from(color.r),
                i64::from(color.g),
                i64::from(color.b),
                i64::from(color.a),
            ]),
            ..Self::default()
        }
    }

    pub fn brightness(brightness: u8) -> Self {
        Self {
            brightness: Some(i64::from(brightness)),
            ..Self::default()
        }
    }

    pub fn mode(mode: Mode) -> Self {
        Self {
            mode: Some(mode.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn speed(speed: u8) -> Self {
        Self {
            speed: Some(i64::from(speed)),
            ..Self::default()
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.brightness.is_none()
            && self.mode.is_none()
            && self.mode_num.is_none()
            && self.speed.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostnameResponse {
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
}
