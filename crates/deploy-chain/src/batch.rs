//! Service batch building
//!
//! [`BatchBuilder`] is the service-container handle deployment items install
//! into. [`ServiceBatch`] is an in-memory builder that records each service
//! together with the context loader bound while it was added.

use crate::error::InstallError;
use crate::loader::{context_loader, ClassLoader};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Shared handle to a batch builder
pub type BatchHandle = Arc<Mutex<dyn BatchBuilder>>;

/// Service-container handle accepting installations as a batch
pub trait BatchBuilder: Send {
    /// Add service to the batch
    ///
    /// # Errors
    /// Implementations reject services they cannot accept.
    fn add_service(&mut self, service: ServiceDefinition) -> Result<(), InstallError>;
}

/// Descriptor of a single service to install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Unique service name
    pub name: String,
    /// Names of services this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ServiceDefinition {
    /// Create definition without dependencies
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add dependency
    #[inline]
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

/// Service recorded by a [`ServiceBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledService {
    /// Service descriptor
    pub definition: ServiceDefinition,
    /// Context loader bound when the service was added
    pub loader: ClassLoader,
}

/// In-memory batch builder
#[derive(Debug, Default)]
pub struct ServiceBatch {
    services: Vec<InstalledService>,
    names: HashSet<String>,
}

impl ServiceBatch {
    /// Create empty batch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty batch behind a shared handle
    #[must_use]
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Services in installation order
    #[inline]
    #[must_use]
    pub fn services(&self) -> &[InstalledService] {
        &self.services
    }

    /// Service names in installation order
    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        self.services
            .iter()
            .map(|s| s.definition.name.as_str())
            .collect()
    }

    /// Check if service was added
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Get number of services
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if batch is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl BatchBuilder for ServiceBatch {
    fn add_service(&mut self, service: ServiceDefinition) -> Result<(), InstallError> {
        if !self.names.insert(service.name.clone()) {
            return Err(InstallError::DuplicateService(service.name));
        }
        self.services.push(InstalledService {
            definition: service,
            loader: context_loader(),
        });
        Ok(())
    }
}
