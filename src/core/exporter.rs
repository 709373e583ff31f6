use crate::core::canonical::to_canonical_vec;
use crate::core::{DashboardSource, ExportReport, ExportedDashboard, Storage};
use crate::domain::model::DashboardSummary;
use crate::utils::error::{BackupError, Result};
use std::io::{self, Write};
use std::sync::Mutex;

type ProgressWriter = Box<dyn Write + Send>;

/// Runs one backup pass: list, then fetch, strip and persist each dashboard in
/// listing order. The first error ends the run; nothing is retried.
///
/// A `Backing up... <uri>` line goes to the progress writer (stdout unless
/// replaced) before each fetch.
pub struct DashboardExporter<D: DashboardSource, S: Storage> {
    source: D,
    storage: S,
    progress: Mutex<ProgressWriter>,
}

impl<D: DashboardSource, S: Storage> DashboardExporter<D, S> {
    pub fn new(source: D, storage: S) -> Self {
        Self::with_progress(source, storage, io::stdout())
    }

    pub fn with_progress(source: D, storage: S, progress: impl Write + Send + 'static) -> Self {
        Self {
            source,
            storage,
            progress: Mutex::new(Box::new(progress)),
        }
    }

    pub async fn run(&self) -> Result<ExportReport> {
        tracing::info!("Listing dashboards");
        let summaries = self.source.list_dashboards().await?;
        tracing::info!("Found {} dashboards", summaries.len());

        let mut report = ExportReport::default();
        for summary in &summaries {
            match self.export_one(summary).await {
                Ok(exported) => report.exported.push(exported),
                Err(e) => {
                    tracing::error!(
                        "Backup aborted at '{}' after {} of {} dashboards",
                        summary.uri,
                        report.count(),
                        summaries.len()
                    );
                    return Err(e);
                }
            }
        }

        tracing::info!("Exported {} dashboards", report.count());
        Ok(report)
    }

    async fn export_one(&self, summary: &DashboardSummary) -> Result<ExportedDashboard> {
        self.report_progress(&summary.uri)?;

        let file_name = summary.file_name()?;
        let mut document = self.source.fetch_dashboard(summary).await?;
        document.strip_id(&summary.uri)?;

        let data = to_canonical_vec(document.as_value())?;
        tracing::debug!(
            "Writing {} ({} bytes, title: {}, listed as {:?} of type {:?})",
            file_name,
            data.len(),
            document.title().unwrap_or("<untitled>"),
            summary.title,
            summary.kind
        );
        self.storage.write_file(&file_name, &data).await?;

        Ok(ExportedDashboard {
            uri: summary.uri.clone(),
            file_name,
        })
    }

    fn report_progress(&self, uri: &str) -> Result<()> {
        // A poisoned lock only means an earlier write panicked; the writer is still usable.
        let mut out = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "Backing up... {}", uri)
            .and_then(|_| out.flush())
            .map_err(BackupError::ProgressOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DashboardDocument;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockSource {
        listing: Vec<DashboardSummary>,
        documents: HashMap<String, Value>,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    impl MockSource {
        fn with(entries: &[(&str, Value)]) -> Self {
            Self {
                listing: entries.iter().map(|(uri, _)| DashboardSummary::new(*uri)).collect(),
                documents: entries
                    .iter()
                    .map(|(uri, doc)| (uri.to_string(), doc.clone()))
                    .collect(),
                fetched: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl DashboardSource for MockSource {
        async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>> {
            Ok(self.listing.clone())
        }

        async fn fetch_dashboard(&self, summary: &DashboardSummary) -> Result<DashboardDocument> {
            self.fetched.lock().await.push(summary.uri.clone());
            self.documents
                .get(&summary.uri)
                .cloned()
                .map(DashboardDocument)
                .ok_or_else(|| BackupError::HttpStatus {
                    url: format!("http://mock/api/dashboards/{}", summary.uri),
                    status: 404,
                })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DashboardSource for FailingSource {
        async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>> {
            Err(BackupError::HttpStatus {
                url: "http://mock/api/search".to_string(),
                status: 500,
            })
        }

        async fn fetch_dashboard(&self, _summary: &DashboardSummary) -> Result<DashboardDocument> {
            unreachable!("listing failed")
        }
    }

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    impl MockStorage {
        async fn written(&self) -> Vec<(String, Vec<u8>)> {
            self.files.lock().await.clone()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.push((name.to_string(), data.to_vec()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
    }

    #[tokio::test]
    async fn test_progress_line_per_dashboard() {
        let source = MockSource::with(&[
            ("db/a", json!({"dashboard": {"id": 1}})),
            ("db/b", json!({"dashboard": {"id": 2}})),
        ]);
        let progress = SharedBuffer::default();
        let exporter =
            DashboardExporter::with_progress(source, MockStorage::default(), progress.clone());

        exporter.run().await.unwrap();

        assert_eq!(progress.contents(), "Backing up... db/a\nBacking up... db/b\n");
    }

    #[tokio::test]
    async fn test_closed_progress_output_is_an_error() {
        let source = MockSource::with(&[("db/a", json!({"dashboard": {"id": 1}}))]);
        let fetched = source.fetched.clone();
        let storage = MockStorage::default();
        let exporter = DashboardExporter::with_progress(source, storage.clone(), ClosedPipe);

        let err = exporter.run().await.unwrap_err();

        match &err {
            BackupError::ProgressOutput(source) => {
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_ne!(err.exit_code(), 0);
        assert!(fetched.lock().await.is_empty());
        assert!(storage.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetches_each_dashboard_once_in_listing_order() {
        let source = MockSource::with(&[
            ("db/zeta", json!({"dashboard": {"id": 3, "title": "Zeta"}})),
            ("db/alpha", json!({"dashboard": {"id": 1, "title": "Alpha"}})),
            ("db/mid", json!({"dashboard": {"id": 2, "title": "Mid"}})),
        ]);
        let fetched = source.fetched.clone();
        let storage = MockStorage::default();
        let exporter = DashboardExporter::new(source, storage.clone());

        let report = exporter.run().await.unwrap();

        assert_eq!(report.count(), 3);
        assert_eq!(*fetched.lock().await, vec!["db/zeta", "db/alpha", "db/mid"]);
        let names: Vec<String> = storage.written().await.into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta.json", "alpha.json", "mid.json"]);
    }

    #[tokio::test]
    async fn test_written_documents_have_null_id() {
        let source = MockSource::with(&[("db/mynet", json!({"dashboard": {"id": 42, "title": "MyNet"}}))]);
        let storage = MockStorage::default();
        let exporter = DashboardExporter::new(source, storage.clone());

        exporter.run().await.unwrap();

        let files = storage.written().await;
        assert_eq!(files.len(), 1);
        let written: Value = serde_json::from_slice(&files[0].1).unwrap();
        assert_eq!(written, json!({"dashboard": {"id": null, "title": "MyNet"}}));
    }

    #[tokio::test]
    async fn test_empty_listing_writes_nothing() {
        let source = MockSource::default();
        let fetched = source.fetched.clone();
        let storage = MockStorage::default();
        let exporter = DashboardExporter::new(source, storage.clone());

        let report = exporter.run().await.unwrap();

        assert_eq!(report.count(), 0);
        assert!(fetched.lock().await.is_empty());
        assert!(storage.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_run() {
        let mut source = MockSource::with(&[
            ("db/one", json!({"dashboard": {"id": 1}})),
            ("db/two", json!({"dashboard": {"id": 2}})),
            ("db/three", json!({"dashboard": {"id": 3}})),
        ]);
        source.documents.remove("db/two");
        let fetched = source.fetched.clone();
        let storage = MockStorage::default();
        let exporter = DashboardExporter::new(source, storage.clone());

        let err = exporter.run().await.unwrap_err();

        assert!(matches!(err, BackupError::HttpStatus { status: 404, .. }));
        assert_eq!(*fetched.lock().await, vec!["db/one", "db/two"]);
        assert_eq!(storage.written().await.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_document_aborts_before_write() {
        let source = MockSource::with(&[("db/broken", json!({"meta": {}}))]);
        let storage = MockStorage::default();
        let exporter = DashboardExporter::new(source, storage.clone());

        let err = exporter.run().await.unwrap_err();

        assert!(matches!(err, BackupError::MalformedDocument { .. }));
        assert!(storage.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_unsafe_slug_is_rejected_before_fetch() {
        let source = MockSource::with(&[("db/../etc", json!({"dashboard": {"id": 1}}))]);
        let fetched = source.fetched.clone();
        let storage = MockStorage::default();
        let exporter = DashboardExporter::new(source, storage.clone());

        let err = exporter.run().await.unwrap_err();

        assert!(matches!(err, BackupError::InvalidSummary { .. }));
        assert!(fetched.lock().await.is_empty());
        assert!(storage.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let storage = MockStorage::default();
        let exporter = DashboardExporter::new(FailingSource, storage.clone());

        let err = exporter.run().await.unwrap_err();

        assert!(matches!(err, BackupError::HttpStatus { status: 500, .. }));
        assert!(storage.written().await.is_empty());
    }
}
