//! Host configuration
//!
//! Controls logging and per-operation deadlines of the lifecycle host.

use crate::error::{Result, TfplugError};
use std::time::Duration;

/// Environment variable selecting the log level, as Terraform uses it
pub const LOG_LEVEL_ENV: &str = "TF_LOG";

/// Environment variable overriding the per-operation timeout in seconds
pub const OPERATION_TIMEOUT_ENV: &str = "TF_PROVIDER_TIMEOUT_SECS";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parses Terraform's TF_LOG values; "OFF" and empty strings yield None
    pub fn parse(value: &str) -> Result<Option<Self>> {
        match value.trim().to_ascii_uppercase().as_str() {
            "" | "OFF" => Ok(None),
            "TRACE" | "JSON" => Ok(Some(LogLevel::Trace)),
            "DEBUG" => Ok(Some(LogLevel::Debug)),
            "INFO" => Ok(Some(LogLevel::Info)),
            "WARN" => Ok(Some(LogLevel::Warn)),
            "ERROR" => Ok(Some(LogLevel::Error)),
            other => Err(TfplugError::InvalidConfiguration(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Whether to install a log subscriber
    pub enable_logging: bool,
    pub log_level: LogLevel,
    /// Deadline applied to every lifecycle call
    pub operation_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            log_level: LogLevel::Info,
            operation_timeout: Duration::from_secs(30),
        }
    }
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by TF_LOG and TF_PROVIDER_TIMEOUT_SECS
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(LOG_LEVEL_ENV) {
            match LogLevel::parse(&value)? {
                Some(level) => config.log_level = level,
                None => config.enable_logging = false,
            }
        }

        if let Ok(value) = std::env::var(OPERATION_TIMEOUT_ENV) {
            let secs = value.trim().parse::<u64>().map_err(|e| {
                TfplugError::InvalidConfiguration(format!(
                    "{} must be a whole number of seconds: {}",
                    OPERATION_TIMEOUT_ENV, e
                ))
            })?;
            config.operation_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn without_logging(mut self) -> Self {
        self.enable_logging = false;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}
