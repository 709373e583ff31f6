use crate::config::endpoint::Endpoint;
use crate::core::{ConfigProvider, DashboardDocument, DashboardSource, DashboardSummary};
use crate::utils::error::{BackupError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Read-only client for the Grafana HTTP API.
pub struct GrafanaClient {
    endpoint: Endpoint,
    client: Client,
}

impl GrafanaClient {
    pub fn new(endpoint: Endpoint, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| BackupError::ConfigError {
            message: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self { endpoint, client })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(config.endpoint().clone(), config.request_timeout())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(creds) = self.endpoint.credentials() {
            request = request.basic_auth(&creds.username, creds.password());
        }

        let response = request.send().await.map_err(|source| BackupError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);
        if !status.is_success() {
            return Err(BackupError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| BackupError::Transport {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| BackupError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait::async_trait]
impl DashboardSource for GrafanaClient {
    async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>> {
        self.get_json(&self.endpoint.search_url()).await
    }

    async fn fetch_dashboard(&self, summary: &DashboardSummary) -> Result<DashboardDocument> {
        self.get_json(&self.endpoint.dashboard_url(&summary.uri)).await
    }
}
