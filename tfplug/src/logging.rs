//! Log subscriber setup
//!
//! Terraform reads the plugin handshake from stdout, so logs go to stderr.

use crate::config::HostConfig;

/// Installs a global fmt subscriber at the configured level
///
/// Returns false when logging is disabled or a subscriber is already set.
pub fn init_logging(config: &HostConfig) -> bool {
    if !config.enable_logging {
        return false;
    }

    let level: tracing::Level = config.log_level.into();
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
