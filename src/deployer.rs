//! Deploy orchestration
//!
//! ```text
//! Validating → Uploading → (ConfiguringWebsite) → Done
//!      │            │                │
//!      └────────────┴────────────────┴──→ Failed
//! ```
//!
//! Uploads run with at most `config.concurrency` requests in flight. Every
//! upload is attempted and every failure is logged before the deploy fails
//! with the first one (in walk order). Website configuration is only applied
//! once all uploads succeeded. Objects already written are left in place when
//! a deploy fails.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::DeployConfig;
use crate::context::DeployContext;
use crate::storage::{ObjectStore, OssClient, PutObjectOutput};
use crate::types::{
    ConfigError, DeployError, DeployPhase, DeployReport, DeployResult, FileEntry, StorageError,
    StorageResult, UploadOutcome, WalkError,
};
use crate::walker;

/// Uploads a generated site to one bucket
pub struct Deployer {
    context: DeployContext,
}

impl Deployer {
    pub fn new(context: DeployContext) -> Self {
        Self { context }
    }

    /// Deploy `context.source_dir` to the OSS bucket described by `config`.
    ///
    /// A fresh [`OssClient`] is built for every call.
    pub async fn deploy(&self, config: &DeployConfig) -> DeployResult<DeployReport> {
        self.validate(config)?;

        let client = OssClient::new(config).map_err(|e| {
            self.fail(ConfigError::Invalid {
                field: "endpoint",
                reason: e.to_string(),
            })
        })?;
        info!("Using OSS endpoint {}", client.base_url());

        self.run(config, &client).await
    }

    /// Same as [`Deployer::deploy`] against a caller-supplied store.
    pub async fn deploy_with(
        &self,
        config: &DeployConfig,
        store: &dyn ObjectStore,
    ) -> DeployResult<DeployReport> {
        self.validate(config)?;
        self.run(config, store).await
    }

    fn validate(&self, config: &DeployConfig) -> DeployResult<()> {
        debug!(phase = %DeployPhase::Validating, "validating deploy config");
        config.validate().map_err(|e| self.fail(e))
    }

    async fn run(&self, config: &DeployConfig, store: &dyn ObjectStore) -> DeployResult<DeployReport> {
        let logger = &self.context.logger;
        let source_dir = self.context.source_dir.clone();

        logger.info(&format!(
            "Uploading {} to OSS bucket {}",
            source_dir.display(),
            config.bucket
        ));

        let files = list_source(source_dir).await.map_err(|e| self.fail(e))?;
        info!(phase = %DeployPhase::Uploading, files = files.len(), "uploading files");

        let outcomes = self.upload_all(config, store, &files).await;
        let total = outcomes.len();
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();

        let mut uploaded = Vec::with_capacity(total);
        let mut first_failure = None;
        for outcome in outcomes {
            match outcome.result {
                Ok(_) => uploaded.push(outcome.key),
                Err(source) => {
                    if first_failure.is_none() {
                        first_failure = Some((outcome.key, outcome.path, source));
                    }
                }
            }
        }

        if let Some((key, path, source)) = first_failure {
            return Err(self.fail(DeployError::Upload {
                key,
                path,
                failed,
                total,
                source,
            }));
        }

        let website = match config.website() {
            Some(website) => {
                debug!(phase = %DeployPhase::ConfiguringWebsite, "updating website configuration");
                logger.info(&format!(
                    "Setting bucket website: index={}, error={}, supportSubDir={}",
                    website.index,
                    website.error.as_deref().unwrap_or("-"),
                    website
                        .support_sub_dir
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".to_string())
                ));

                with_timeout(config.timeout, store.put_bucket_website(&website))
                    .await
                    .map_err(|e| self.fail(DeployError::ConfigUpdate(e)))?;
                Some(website)
            }
            None => None,
        };

        info!(phase = %DeployPhase::Done, uploaded = total, "deploy finished");
        logger.info(&format!(
            "Deploy done: {} files uploaded to {}",
            total, config.bucket
        ));

        Ok(DeployReport { uploaded, website })
    }

    async fn upload_all(
        &self,
        config: &DeployConfig,
        store: &dyn ObjectStore,
        files: &[FileEntry],
    ) -> Vec<UploadOutcome> {
        let mut outcomes: Vec<(usize, UploadOutcome)> = stream::iter(files.iter().enumerate())
            .map(|(idx, file)| async move { (idx, self.upload_one(config, store, file).await) })
            .buffer_unordered(config.concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(idx, _)| *idx);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn upload_one(
        &self,
        config: &DeployConfig,
        store: &dyn ObjectStore,
        file: &FileEntry,
    ) -> UploadOutcome {
        let result = put_file(store, file, config.timeout).await;

        match &result {
            Ok(output) => {
                debug!(key = %file.key, status = output.status, etag = ?output.etag, "uploaded");
                self.context.logger.info(&format!("Uploaded: {}", file.key));
            }
            Err(e) => {
                warn!(key = %file.key, error = %e, "upload failed");
                self.context
                    .logger
                    .error(&format!("Failed to upload {}: {}", file.key, e));
            }
        }

        UploadOutcome {
            key: file.key.clone(),
            path: file.path.clone(),
            result,
        }
    }

    fn fail(&self, err: impl Into<DeployError>) -> DeployError {
        let err = err.into();
        warn!(phase = %err.phase(), "deploy {}: {}", DeployPhase::Failed, err);
        self.context.logger.error(&format!("Deploy failed: {}", err));
        err
    }
}

async fn list_source(source_dir: PathBuf) -> Result<Vec<FileEntry>, WalkError> {
    let dir = source_dir.clone();
    tokio::task::spawn_blocking(move || walker::list_files(&dir))
        .await
        .map_err(|e| WalkError::Io {
            path: source_dir,
            source: std::io::Error::other(e),
        })?
}

async fn put_file(
    store: &dyn ObjectStore,
    file: &FileEntry,
    timeout: Duration,
) -> StorageResult<PutObjectOutput> {
    let body = tokio::fs::read(&file.path).await?;
    let content_type = content_type_for(&file.path);
    with_timeout(
        timeout,
        store.put_object(&file.key, Bytes::from(body), &content_type),
    )
    .await
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| StorageError::Timeout(timeout))?
}

/// MIME type from the file extension, `application/octet-stream` when unknown
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or(mime::APPLICATION_OCTET_STREAM)
        .to_string()
}
