// OSS Deployer - upload a generated static site to an Alibaba Cloud OSS bucket

pub mod config;
pub mod context;
pub mod deployer;
pub mod storage;
pub mod types;
pub mod utils;
pub mod walker;

// Re-exports for convenience
pub use crate::config::DeployConfig;
pub use context::{DeployContext, Logger};
pub use deployer::Deployer;
pub use storage::{ObjectMeta, ObjectStore, OssClient, PutObjectOutput, WebsiteConfig};
pub use types::{
    ConfigError, DeployError, DeployPhase, DeployReport, DeployResult, FileEntry, StorageError,
    StorageResult, UploadOutcome, WalkError,
};
pub use utils::{init_logger, TracingLogger};
