use crate::config::endpoint::Endpoint;
use crate::domain::model::{DashboardDocument, DashboardSummary};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub trait Storage: Send + Sync {
    /// Write `data` to `name` inside the storage root, replacing any existing file.
    fn write_file(
        &self,
        name: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn endpoint(&self) -> &Endpoint;
    fn output_dir(&self) -> &Path;
    fn request_timeout(&self) -> Option<Duration>;
}

#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>>;
    async fn fetch_dashboard(&self, summary: &DashboardSummary) -> Result<DashboardDocument>;
}
