// Logger initialization and the tracing-backed host logger

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::context::Logger;

const DEFAULT_FILTER: &str = "oss_deployer=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (default `oss_deployer=info`).
///
/// Hosts that already installed a subscriber keep theirs; calling this twice is harmless.
pub fn init_logger() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Host logger that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, msg: &str) {
        tracing::info!(target: "oss_deployer", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "oss_deployer", "{}", msg);
    }
}
