// Type definitions and error taxonomy

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::storage::{PutObjectOutput, WebsiteConfig};

/// Where a deploy run is (or was when it stopped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Validating,
    Uploading,
    ConfiguringWebsite,
    Done,
    Failed,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployPhase::Validating => write!(f, "validating"),
            DeployPhase::Uploading => write!(f, "uploading"),
            DeployPhase::ConfiguringWebsite => write!(f, "configuring-website"),
            DeployPhase::Done => write!(f, "done"),
            DeployPhase::Failed => write!(f, "failed"),
        }
    }
}

/// A regular file found under the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the source directory, `/`-separated. Used as the object key.
    pub key: String,
    /// Absolute (or source-dir-joined) path to read the bytes from
    pub path: PathBuf,
}

/// Outcome of a single object upload
#[derive(Debug)]
pub struct UploadOutcome {
    pub key: String,
    pub path: PathBuf,
    pub result: Result<PutObjectOutput, StorageError>,
}

impl UploadOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of a successful deploy
#[derive(Debug, Clone, Default)]
pub struct DeployReport {
    /// Object keys written, in walk order
    pub uploaded: Vec<String>,
    /// Website configuration applied, if any
    pub website: Option<WebsiteConfig>,
}

/// Invalid or missing deploy configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config field `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to load deploy config: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Load(e.to_string())
    }
}

/// Problems listing the source directory
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("source directory not found: {0}")]
    NotFound(PathBuf),

    #[error("source path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("symlink cycle at {path} (loops back to {ancestor})")]
    Cycle { path: PathBuf, ancestor: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by an `ObjectStore` implementation
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("OSS returned {status} {code}: {message} (request id: {request_id})")]
    Service {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to sign request: {0}")]
    Sign(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// HTTP status reported by the service, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Service { status, .. } => Some(*status),
            StorageError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors returned by `Deployer::deploy`
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("failed to upload {key} ({failed} of {total} files failed): {source}")]
    Upload {
        key: String,
        path: PathBuf,
        failed: usize,
        total: usize,
        #[source]
        source: StorageError,
    },

    #[error("failed to update bucket website configuration: {0}")]
    ConfigUpdate(#[source] StorageError),
}

impl DeployError {
    /// Phase the deploy was in when this error was raised
    pub fn phase(&self) -> DeployPhase {
        match self {
            DeployError::Config(_) => DeployPhase::Validating,
            DeployError::Walk(_) | DeployError::Upload { .. } => DeployPhase::Uploading,
            DeployError::ConfigUpdate(_) => DeployPhase::ConfiguringWebsite,
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type DeployResult<T> = std::result::Result<T, DeployError>;
