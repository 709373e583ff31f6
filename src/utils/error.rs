use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dashboard document for '{uri}': {reason}")]
    MalformedDocument { uri: String, reason: String },

    #[error("Invalid dashboard uri '{uri}': {reason}")]
    InvalidSummary { uri: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to write progress output: {0}")]
    ProgressOutput(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Server,
    Data,
    Filesystem,
    Configuration,
}

impl BackupError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BackupError::Transport { .. } => ErrorCategory::Network,
            BackupError::HttpStatus { .. } => ErrorCategory::Server,
            BackupError::Decode { .. }
            | BackupError::MalformedDocument { .. }
            | BackupError::InvalidSummary { .. }
            | BackupError::Serialization(_) => ErrorCategory::Data,
            BackupError::Filesystem { .. } | BackupError::ProgressOutput(_) => {
                ErrorCategory::Filesystem
            }
            BackupError::ConfigError { .. } | BackupError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    /// Process exit code for a run that ended with this error. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            _ => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BackupError::Transport { .. } => {
                "Check that the server is running and reachable at the configured uri"
            }
            BackupError::HttpStatus { status: 401, .. }
            | BackupError::HttpStatus { status: 403, .. } => {
                "Check the username and password used to access the server"
            }
            BackupError::HttpStatus { status: 404, .. } => {
                "Check the base uri; the server did not recognise the API path"
            }
            BackupError::HttpStatus { .. } => "Check the server logs for the failing request",
            BackupError::Decode { .. } | BackupError::MalformedDocument { .. } => {
                "Make sure the uri points at a dashboard server and not a proxy or login page"
            }
            BackupError::InvalidSummary { .. } => {
                "Rename the dashboard on the server so that it has a plain slug"
            }
            BackupError::Filesystem { .. } => {
                "Make sure the output directory exists and is writable"
            }
            BackupError::ProgressOutput(_) => {
                "Standard output was closed; redirect it to a file instead of a closed pipe"
            }
            BackupError::Serialization(_) => "Report this dashboard, it could not be re-encoded",
            BackupError::ConfigError { .. } | BackupError::InvalidConfigValueError { .. } => {
                "Check the command line flags and the config file"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the dashboard server. {}", self),
            ErrorCategory::Server => format!("The dashboard server rejected a request. {}", self),
            ErrorCategory::Data => format!("Received unexpected data. {}", self),
            ErrorCategory::Filesystem => format!("Could not write the backup. {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration. {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
