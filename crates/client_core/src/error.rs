use thiserror::Error;

/// Failures surfaced by the client.
///
/// Every network problem collapses into [`ClientError::Communication`]: an unreachable device,
/// a non-2xx status and an undecodable body are indistinguishable to callers.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("communication with device failed on {path}: {reason}")]
    Communication { path: String, reason: String },
    #[error("invalid device url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("cache error: {0}")]
    Cache(String),
}

impl ClientError {
    pub fn communication(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Communication {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, Self::Communication { .. })
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
