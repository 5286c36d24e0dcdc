use thiserror::Error;

use crate::terminology::TerminologyError;

#[derive(Error, Debug)]
pub enum ConformanceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Terminology service error: {0}")]
    Terminology(#[from] TerminologyError),

    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ConformanceError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Whether this error came from the terminology service rather than from
    /// local configuration or input files.
    pub fn is_service_fault(&self) -> bool {
        matches!(self, Self::Terminology(_))
    }
}

pub type Result<T> = std::result::Result<T, ConformanceError>;
