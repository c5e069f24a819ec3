use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Forwards domain log lines to the `tracing` subscriber installed by the binary.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(target: "crowd_nav::navigation", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "crowd_nav::navigation", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "crowd_nav::navigation", "{}", msg);
    }
}

/// Console-backed DomainLogger, also the fallback when no log file is configured.
pub fn init_console_logger() -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge)
}
