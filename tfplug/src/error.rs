//! Error types for tfplug

use crate::types::Diagnostic;

/// Errors raised by the framework and the lifecycle host
#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Unknown resource type: {0}")]
    ResourceNotFound(String),

    #[error("Invalid host configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid attribute path: {0}")]
    InvalidPath(String),

    #[error("Failed to encode value: {0}")]
    EncodingError(String),

    #[error("Failed to decode value: {0}")]
    DecodingError(String),

    #[error("Expected a {expected} value, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Error diagnostics returned by a lifecycle call
    #[error("{}", summarize(.0))]
    Diagnostics(Vec<Diagnostic>),
}

impl TfplugError {
    /// Error diagnostics carried by this error, if any
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            TfplugError::Diagnostics(diags) => diags,
            _ => &[],
        }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| {
            if d.detail.is_empty() {
                d.summary.clone()
            } else {
                format!("{}: {}", d.summary, d.detail)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, TfplugError>;
