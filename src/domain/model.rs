use crate::utils::error::{BackupError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Length of the constant type prefix on summary uris, e.g. `db/`.
const URI_PREFIX_LEN: usize = 3;

/// One entry of the `/api/search` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl DashboardSummary {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: None,
            kind: None,
        }
    }

    /// The uri without its 3-character prefix. Must be usable as a bare file name.
    pub fn slug(&self) -> Result<&str> {
        let slug = match self.uri.char_indices().nth(URI_PREFIX_LEN) {
            Some((offset, _)) => &self.uri[offset..],
            None => "",
        };

        let reason = if slug.is_empty() {
            Some("slug is empty")
        } else if slug.contains('/') || slug.contains('\\') {
            Some("slug contains a path separator")
        } else if slug == "." || slug == ".." {
            Some("slug is a relative path component")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(BackupError::InvalidSummary {
                uri: self.uri.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(slug),
        }
    }

    pub fn file_name(&self) -> Result<String> {
        Ok(format!("{}.json", self.slug()?))
    }
}

/// A full dashboard as returned by `/api/dashboards/<uri>`. Everything except
/// `dashboard.id` is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardDocument(pub Value);

impl DashboardDocument {
    /// Replace the server-assigned `dashboard.id` with `null` so the export can
    /// be imported into another server. Inserts the key when it is missing.
    pub fn strip_id(&mut self, uri: &str) -> Result<()> {
        let dashboard = self
            .0
            .as_object_mut()
            .ok_or_else(|| BackupError::MalformedDocument {
                uri: uri.to_string(),
                reason: "document is not a JSON object".to_string(),
            })?
            .get_mut("dashboard")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| BackupError::MalformedDocument {
                uri: uri.to_string(),
                reason: "missing 'dashboard' object".to_string(),
            })?;

        dashboard.insert("id".to_string(), Value::Null);
        Ok(())
    }

    pub fn title(&self) -> Option<&str> {
        self.0.pointer("/dashboard/title").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDashboard {
    pub uri: String,
    pub file_name: String,
}

/// Dashboards written by one run, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported: Vec<ExportedDashboard>,
}

impl ExportReport {
    pub fn count(&self) -> usize {
        self.exported.len()
    }
}
