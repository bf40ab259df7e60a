#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use oss_deployer::{
    DeployConfig, DeployContext, Logger, ObjectMeta, ObjectStore, PutObjectOutput, StorageError,
    StorageResult, WebsiteConfig,
};

/// In-memory bucket with call counting and injectable failures
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<BTreeMap<String, (Bytes, String)>>,
    pub website: Mutex<Option<WebsiteConfig>>,
    pub calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub website_calls: AtomicUsize,
    pub fail_keys: HashSet<String>,
    pub fail_website: bool,
    pub delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_website() -> Self {
        Self {
            fail_website: true,
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).map(|(b, _)| b.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<PutObjectOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_keys.contains(key) {
            return Err(StorageError::InvalidRequest(format!(
                "simulated network error for {}",
                key
            )));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(PutObjectOutput {
            status: 200,
            etag: Some(format!("etag-{}", key)),
        })
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.content(key).ok_or_else(|| not_found(key))
    }

    async fn get_object_meta(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.content(key).ok_or_else(|| not_found(key))?;
        Ok(ObjectMeta {
            status: 200,
            etag: Some(format!("etag-{}", key)),
            content_length: Some(body.len() as u64),
            last_modified: None,
        })
    }

    async fn put_bucket_website(&self, website: &WebsiteConfig) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.website_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_website {
            return Err(StorageError::Service {
                status: 403,
                code: "AccessDenied".to_string(),
                message: "no website permission".to_string(),
                request_id: "test".to_string(),
            });
        }
        *self.website.lock().unwrap() = Some(website.clone());
        Ok(())
    }

    async fn get_bucket_website(&self) -> StorageResult<WebsiteConfig> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.website
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| not_found("?website"))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

fn not_found(key: &str) -> StorageError {
    StorageError::Service {
        status: 404,
        code: "NoSuchKey".to_string(),
        message: format!("{} does not exist", key),
        request_id: "test".to_string(),
    }
}

/// Logger that keeps every line for assertions
#[derive(Default)]
pub struct RecordingLogger {
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, msg: &str) {
        self.infos.lock().unwrap().push(msg.to_string());
    }

    fn error(&self, msg: &str) {
        self.errors.lock().unwrap().push(msg.to_string());
    }
}

pub fn config() -> DeployConfig {
    DeployConfig::new("oss-cn-hangzhou", "test-bucket", "AK", "SK")
}

pub fn context(dir: &Path) -> (DeployContext, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    (DeployContext::new(dir, logger.clone()), logger)
}

pub fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
