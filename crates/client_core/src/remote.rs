//! Requests against the device endpoint.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::protocol::{
    config_route, hostname_route, state_route, ConfigCommand, HostnameResponse, StateSnapshot,
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    controls::ErrorSignal,
    error::{ClientError, Result},
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Moves JSON between the client and the device. `body` absent means a read-only query.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn exchange(&self, path: &str, body: Option<&ConfigCommand>) -> Result<Value>;
}

pub struct MissingDeviceTransport;

#[async_trait]
impl DeviceTransport for MissingDeviceTransport {
    async fn exchange(&self, path: &str, _body: Option<&ConfigCommand>) -> Result<Value> {
        Err(ClientError::communication(path, "device transport is unavailable"))
    }
}

/// HTTP transport. The base url may carry a path prefix, e.g. when the device sits behind a proxy.
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: "device url must start with http:// or https://".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DeviceTransport for HttpTransport {
    async fn exchange(&self, path: &str, body: Option<&ConfigCommand>) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let request = match body {
            Some(body) => self.http.post(&url).json(body),
            None => self.http.get(&url),
        };
        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ClientError::communication(path, e))?;
        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::communication(path, e))
    }
}

/// Device client. Every failure is reported to the error signal before it is returned, and
/// nothing is retried.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn DeviceTransport>,
    errors: Arc<dyn ErrorSignal>,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn DeviceTransport>, errors: Arc<dyn ErrorSignal>) -> Self {
        Self { transport, errors }
    }

    pub async fn send(&self, path: &str, payload: Option<&ConfigCommand>) -> Result<StateSnapshot> {
        self.exchange(path, payload).await
    }

    pub async fn fetch_state(&self) -> Result<StateSnapshot> {
        self.send(state_route(), None).await
    }

    pub async fn send_config(&self, command: &ConfigCommand) -> Result<StateSnapshot> {
        self.send(config_route(), Some(command)).await
    }

    pub async fn fetch_hostname(&self) -> Result<String> {
        let response: HostnameResponse = self.exchange(hostname_route(), None).await?;
        Ok(response.hostname)
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Option<&ConfigCommand>,
    ) -> Result<T> {
        let result = self
            .transport
            .exchange(path, payload)
            .await
            .and_then(|value| {
                serde_json::from_value::<T>(value).map_err(|e| ClientError::communication(path, e))
            });
        match result {
            Ok(decoded) => {
                debug!(path, command = payload.is_some(), "device responded");
                Ok(decoded)
            }
            Err(error) => {
                warn!(path, %error, "device request failed");
                self.errors.present();
                Err(error)
            }
        }
    }
}
