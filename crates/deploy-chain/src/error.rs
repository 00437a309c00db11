//! Error types for the deployment chain
//!
//! Provides error handling for:
//! - Processor registration (duplicates, malformed entries)
//! - Processor-origin failures surfaced by a chain run
//! - Deployment item installation
//! - Chain configuration loading

use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure raised by a processor that cannot advance the deployment
///
/// The chain surfaces this value verbatim; it never rewrites the message
/// or the source.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DeploymentUnitProcessingError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DeploymentUnitProcessingError {
    /// Create error with message
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create error wrapping an underlying cause
    #[inline]
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable failure message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main chain error type
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Entry could not be constructed from its inputs
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An entry with the same name and priority is already registered
    #[error("duplicate processor name and priority: {name}:{priority}")]
    DuplicateRegistration {
        /// Processor name
        name: String,
        /// Processor priority
        priority: i64,
    },

    /// A processor refused to proceed
    #[error(transparent)]
    Processing(#[from] DeploymentUnitProcessingError),

    /// The chain was re-entered with a context it is already processing
    #[error("chain `{chain}` is already processing this deployment context")]
    ReentrantRun {
        /// Chain name
        chain: String,
    },

    /// Configuration referenced a processor the catalog does not provide
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),
}

impl ChainError {
    /// Check if the caller can recover by changing its request
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRegistration { .. } | Self::InvalidArgument(_) | Self::UnknownProcessor(_)
        )
    }

    /// The processor failure behind this error, if any
    #[inline]
    #[must_use]
    pub fn processing_error(&self) -> Option<&DeploymentUnitProcessingError> {
        match self {
            Self::Processing(err) => Some(err),
            _ => None,
        }
    }
}

/// Deployment item installation errors
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Batch already holds a service with this name
    #[error("duplicate service: {0}")]
    DuplicateService(String),

    /// Installation failed
    #[error("install failed: {0}")]
    Failed(String),
}

/// Errors from running a chain and installing its items
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The chain run failed
    #[error("processing failed: {0}")]
    Processing(#[from] ChainError),

    /// No batch builder was attached to the context
    #[error("deployment `{0}` has no batch builder")]
    MissingBatchBuilder(String),

    /// A deployment item failed to install
    #[error("deployment item {index} failed to install: {source}")]
    Install {
        /// Position of the failing item
        index: usize,
        /// Underlying failure
        #[source]
        source: InstallError,
    },
}

/// Chain configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for a chain
    #[error("failed to parse chain config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be turned into a chain
    #[error("failed to build chain: {0}")]
    Chain(#[from] ChainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_error_display_is_message() {
        let err = DeploymentUnitProcessingError::new("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn processing_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing manifest");
        let err = DeploymentUnitProcessingError::with_source("cannot read manifest", io);
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "missing manifest");
    }

    #[test]
    fn chain_error_processing_is_transparent() {
        let err = ChainError::from(DeploymentUnitProcessingError::new("boom"));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.processing_error().map(|e| e.message()), Some("boom"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn duplicate_registration_display() {
        let err = ChainError::DuplicateRegistration {
            name: "parse".to_string(),
            priority: 7,
        };
        assert!(err.to_string().contains("parse:7"));
        assert!(err.is_recoverable());
    }
}
