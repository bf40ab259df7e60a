//! What the host hands the deployer: where the generated site lives and
//! where to report progress.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::utils::TracingLogger;

/// Progress/failure sink owned by the host
pub trait Logger: Send + Sync {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Deploy context supplied by the host
#[derive(Clone)]
pub struct DeployContext {
    /// Generated site output (the host's `public_dir`)
    pub source_dir: PathBuf,
    pub logger: Arc<dyn Logger>,
}

impl DeployContext {
    pub fn new(source_dir: impl Into<PathBuf>, logger: Arc<dyn Logger>) -> Self {
        Self {
            source_dir: source_dir.into(),
            logger,
        }
    }

    /// Context that logs through `tracing`
    pub fn with_tracing(source_dir: impl Into<PathBuf>) -> Self {
        Self::new(source_dir, Arc::new(TracingLogger))
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

impl fmt::Debug for DeployContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployContext")
            .field("source_dir", &self.source_dir)
            .finish_non_exhaustive()
    }
}
