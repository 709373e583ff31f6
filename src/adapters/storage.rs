use crate::core::{ConfigProvider, Storage};
use crate::utils::error::{BackupError, Result};
use std::path::PathBuf;

/// Writes backups into an existing directory. The directory is not created:
/// a missing target is reported on the first write.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self::new(config.output_dir())
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(name);

        // Plain truncate-and-write, a crash mid-write can leave a partial file.
        tokio::fs::write(&full_path, data)
            .await
            .map_err(|source| BackupError::Filesystem {
                path: full_path,
                source,
            })
    }
}
