use thiserror::Error;
use tfplug::Diagnostic;

#[derive(Debug, Error, PartialEq)]
pub enum PassphraseError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to generate passphrase: {0}")]
    Generation(String),

    #[error("Unexpected schema version: {0}")]
    UnsupportedSchemaVersion(i64),
}

impl PassphraseError {
    /// Short title used as the diagnostic summary
    pub fn summary(&self) -> &'static str {
        match self {
            PassphraseError::InvalidConfiguration(_) => "Invalid passphrase configuration",
            PassphraseError::Generation(_) => "Passphrase generation failed",
            PassphraseError::UnsupportedSchemaVersion(_) => "Unable to Upgrade Resource State",
        }
    }
}

impl From<PassphraseError> for Diagnostic {
    fn from(err: PassphraseError) -> Self {
        Diagnostic::error(err.summary(), err.to_string())
    }
}
