use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable reason carried in an [`ApiError`] body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MalformedBody,
    MissingSetting,
    InvalidMode,
}

/// Error body returned by the device for rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Why the device refused a config request. Every variant leaves the device state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigRejection {
    #[error("invalid config body: {0}")]
    MalformedBody(String),
    #[error("mode, mode_num, brightness, color, speed, or status is required.")]
    MissingSetting,
    #[error("Invalid mode or mode_num")]
    InvalidMode,
}

impl ConfigRejection {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigRejection::MalformedBody(_) => ErrorCode::MalformedBody,
            ConfigRejection::MissingSetting => ErrorCode::MissingSetting,
            ConfigRejection::InvalidMode => ErrorCode::InvalidMode,
        }
    }
}

impl From<ConfigRejection> for ApiError {
    fn from(value: ConfigRejection) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
