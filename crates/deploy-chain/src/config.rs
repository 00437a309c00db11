//! Chain configuration
//!
//! A chain can be described in TOML and built against a
//! [`ProcessorCatalog`] that knows how to create each named processor:
//!
//! ```toml
//! name = "default"
//!
//! [[processor]]
//! processor = "parse-manifest"
//! priority = 100
//!
//! [[processor]]
//! processor = "install-services"
//! priority = "max"
//! ```

use crate::chain::DeploymentChain;
use crate::error::{ChainError, ConfigError};
use crate::processor::DeploymentUnitProcessor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Declarative description of a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain name
    pub name: String,
    /// Processor bindings, in any order
    #[serde(default, rename = "processor")]
    pub processors: Vec<ProcessorBinding>,
}

/// One processor registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorBinding {
    /// Catalog name of the processor
    pub processor: String,
    /// Priority to register it at
    pub priority: PriorityValue,
}

/// Priority as written in configuration
///
/// Either an integer or text: a decimal integer, `"min"` or `"max"`.
/// Any other TOML value (a float, a boolean, an array) still parses, so a
/// bad priority is reported by [`PriorityValue::resolve`] like malformed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriorityValue {
    /// Integer priority
    Integer(i64),
    /// Textual priority
    Text(String),
    /// Value of any other type; never resolves
    Other(toml::Value),
}

impl PriorityValue {
    /// Resolve to a signed priority
    ///
    /// # Errors
    /// Returns [`ChainError::InvalidArgument`] for malformed text or a value
    /// that is neither an integer nor text.
    pub fn resolve(&self) -> Result<i64, ChainError> {
        match self {
            Self::Integer(value) => Ok(*value),
            Self::Text(text) => match text.trim() {
                "min" => Ok(i64::MIN),
                "max" => Ok(i64::MAX),
                other => other.parse().map_err(|_| {
                    ChainError::InvalidArgument(format!("malformed priority `{text}`"))
                }),
            },
            Self::Other(value) => Err(ChainError::InvalidArgument(format!(
                "malformed priority `{value}`"
            ))),
        }
    }
}

impl From<i64> for PriorityValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl ChainConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if the text is not a valid chain config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read configuration from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Build a chain from this configuration
    ///
    /// # Errors
    /// - [`ChainError::UnknownProcessor`] for names missing from `catalog`
    /// - [`ChainError::InvalidArgument`] for malformed priorities
    /// - [`ChainError::DuplicateRegistration`] for repeated bindings
    pub fn build(&self, catalog: &ProcessorCatalog) -> Result<DeploymentChain, ChainError> {
        let chain = DeploymentChain::new(self.name.clone());
        for binding in &self.processors {
            let priority = binding.priority.resolve()?;
            let processor = catalog
                .create(&binding.processor)
                .ok_or_else(|| ChainError::UnknownProcessor(binding.processor.clone()))?;
            chain.add_processor(processor, priority)?;
        }
        debug!(chain = %self.name, processors = chain.len(), "chain built from config");
        Ok(chain)
    }
}

impl DeploymentChain {
    /// Build a chain from configuration
    ///
    /// # Errors
    /// See [`ChainConfig::build`].
    pub fn from_config(
        config: &ChainConfig,
        catalog: &ProcessorCatalog,
    ) -> Result<Self, ChainError> {
        config.build(catalog)
    }

    /// Read a TOML chain description and build it
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read, parsed or built.
    pub fn from_path(
        path: impl AsRef<Path>,
        catalog: &ProcessorCatalog,
    ) -> Result<Self, ConfigError> {
        Ok(ChainConfig::from_path(path)?.build(catalog)?)
    }
}

type ProcessorFactory = Arc<dyn Fn() -> Arc<dyn DeploymentUnitProcessor> + Send + Sync>;

/// Named processor factories available to configuration
#[derive(Clone, Default)]
pub struct ProcessorCatalog {
    factories: BTreeMap<String, ProcessorFactory>,
}

impl ProcessorCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn DeploymentUnitProcessor> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Register a shared instance under `name`
    pub fn register_instance(
        &mut self,
        name: impl Into<String>,
        processor: Arc<dyn DeploymentUnitProcessor>,
    ) {
        self.register(name, move || Arc::clone(&processor));
    }

    /// Create the processor registered under `name`
    #[must_use]
    pub fn create(&self, name: &str) -> Option<Arc<dyn DeploymentUnitProcessor>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Check if name is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for ProcessorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorCatalog")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
