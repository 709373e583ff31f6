pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{http::GrafanaClient, storage::LocalStorage};
pub use config::{endpoint::Endpoint, BackupSettings};
pub use crate::core::exporter::DashboardExporter;
pub use utils::error::{BackupError, Result};

use std::path::Path;

/// Back up every dashboard on `endpoint` into `output_dir` and return how many
/// were written. Stops at the first error.
pub async fn export(endpoint: &Endpoint, output_dir: &Path) -> Result<usize> {
    let settings = BackupSettings::new(endpoint.clone(), output_dir);
    export_with(&settings).await
}

pub async fn export_with(settings: &BackupSettings) -> Result<usize> {
    let client = GrafanaClient::from_config(settings)?;
    let storage = LocalStorage::from_config(settings);
    let report = DashboardExporter::new(client, storage).run().await?;
    Ok(report.count())
}
