// Storage layer (Alibaba Cloud OSS)

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::StorageResult;

pub mod oss_client;
pub mod signer;
pub mod website;

pub use oss_client::OssClient;
pub use website::WebsiteConfig;

/// Result of a successful `put_object`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub status: u16,
    pub etag: Option<String>,
}

/// Object metadata as returned by `get_object_meta`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub status: u16,
    pub etag: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<String>,
}

/// A bucket-scoped object store.
///
/// The deployer only needs `put_object` and `put_bucket_website`; the rest is
/// what hosts and tests use to check a deploy landed.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<PutObjectOutput>;

    async fn get_object(&self, key: &str) -> StorageResult<Bytes>;

    async fn get_object_meta(&self, key: &str) -> StorageResult<ObjectMeta>;

    async fn put_bucket_website(&self, website: &WebsiteConfig) -> StorageResult<()>;

    async fn get_bucket_website(&self) -> StorageResult<WebsiteConfig>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;
}
