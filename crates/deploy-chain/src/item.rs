//! Deployment items
//!
//! A [`DeploymentItem`] is produced while a chain runs and installed later
//! against a batch builder. Items are serializable trait objects; every
//! concrete variant carries a stable tag so it can cross a process boundary
//! before installation.

use crate::batch::{BatchBuilder, ServiceDefinition};
use crate::error::InstallError;
use crate::loader::{ClassLoader, ContextLoaderScope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Context handed to [`DeploymentItem::install`]
pub struct DeploymentItemContext<'a> {
    batch: &'a mut dyn BatchBuilder,
}

impl<'a> DeploymentItemContext<'a> {
    /// Create context over a batch builder
    #[inline]
    pub fn new(batch: &'a mut dyn BatchBuilder) -> Self {
        Self { batch }
    }

    /// Batch builder to install into
    #[inline]
    pub fn batch_builder(&mut self) -> &mut (dyn BatchBuilder + 'a) {
        &mut *self.batch
    }
}

impl fmt::Debug for DeploymentItemContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentItemContext").finish_non_exhaustive()
    }
}

/// Descriptor produced by the chain and realized against a batch builder
#[typetag::serde(tag = "item")]
pub trait DeploymentItem: fmt::Debug + Send + Sync {
    /// Install this item
    ///
    /// # Errors
    /// Returns the batch builder's or the item's own failure.
    fn install(&self, context: &mut DeploymentItemContext<'_>) -> Result<(), InstallError>;
}

/// Service descriptor wrapped by a [`ServiceDeploymentItem`]
#[typetag::serde(tag = "deployment")]
pub trait ServiceDeployment: fmt::Debug + Send + Sync {
    /// Loader the descriptor's types were loaded from
    fn class_loader(&self) -> ClassLoader;

    /// Add this descriptor's services to the batch
    ///
    /// # Errors
    /// Returns the batch builder's or the descriptor's own failure.
    fn install(&self, batch: &mut dyn BatchBuilder) -> Result<(), InstallError>;
}

/// Deployment item that installs a [`ServiceDeployment`]
///
/// While the descriptor installs, the thread's context loader is bound to
/// the descriptor's loader; the previous loader is restored on every exit
/// path.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceDeploymentItem {
    deployment: Box<dyn ServiceDeployment>,
}

impl ServiceDeploymentItem {
    /// Wrap a service descriptor
    #[inline]
    #[must_use]
    pub fn new(deployment: impl ServiceDeployment + 'static) -> Self {
        Self {
            deployment: Box::new(deployment),
        }
    }

    /// Wrapped descriptor
    #[inline]
    #[must_use]
    pub fn deployment(&self) -> &dyn ServiceDeployment {
        self.deployment.as_ref()
    }
}

#[typetag::serde(name = "service")]
impl DeploymentItem for ServiceDeploymentItem {
    fn install(&self, context: &mut DeploymentItemContext<'_>) -> Result<(), InstallError> {
        let _scope = ContextLoaderScope::enter(self.deployment.class_loader());
        self.deployment.install(context.batch_builder())
    }
}

/// Service descriptor listing a fixed set of services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticServiceDeployment {
    loader: ClassLoader,
    services: Vec<ServiceDefinition>,
}

impl StaticServiceDeployment {
    /// Create descriptor owned by `loader`
    #[inline]
    #[must_use]
    pub fn new(loader: ClassLoader) -> Self {
        Self {
            loader,
            services: Vec::new(),
        }
    }

    /// Add service
    #[inline]
    #[must_use]
    pub fn with_service(mut self, service: ServiceDefinition) -> Self {
        self.services.push(service);
        self
    }

    /// Services in installation order
    #[inline]
    #[must_use]
    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }
}

#[typetag::serde(name = "static")]
impl ServiceDeployment for StaticServiceDeployment {
    fn class_loader(&self) -> ClassLoader {
        self.loader.clone()
    }

    fn install(&self, batch: &mut dyn BatchBuilder) -> Result<(), InstallError> {
        self.services
            .iter()
            .try_for_each(|service| batch.add_service(service.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ServiceBatch;
    use crate::loader::context_loader;

    fn web_deployment() -> StaticServiceDeployment {
        StaticServiceDeployment::new(ClassLoader::named("web.war"))
            .with_service(ServiceDefinition::new("web.servlet"))
            .with_service(ServiceDefinition::new("web.filter").with_dependency("web.servlet"))
    }

    #[test]
    fn service_item_installs_under_descriptor_loader() {
        let mut batch = ServiceBatch::new();
        let item = ServiceDeploymentItem::new(web_deployment());

        item.install(&mut DeploymentItemContext::new(&mut batch))
            .unwrap();

        assert_eq!(batch.service_names(), vec!["web.servlet", "web.filter"]);
        assert!(batch
            .services()
            .iter()
            .all(|s| s.loader.name() == "web.war"));
        assert!(context_loader().is_system());
    }

    #[test]
    fn service_item_restores_loader_on_failure() {
        let mut batch = ServiceBatch::new();
        batch
            .add_service(ServiceDefinition::new("web.filter"))
            .unwrap();
        let before = context_loader();

        let item = ServiceDeploymentItem::new(web_deployment());
        let err = item
            .install(&mut DeploymentItemContext::new(&mut batch))
            .unwrap_err();

        assert!(matches!(err, InstallError::DuplicateService(_)));
        assert_eq!(context_loader(), before);
    }

    #[test]
    fn service_item_serializes_with_stable_tags() {
        let item: Box<dyn DeploymentItem> = Box::new(ServiceDeploymentItem::new(web_deployment()));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["item"], "service");
        assert_eq!(json["deployment"]["deployment"], "static");

        let back: Box<dyn DeploymentItem> = serde_json::from_value(json).unwrap();
        let mut batch = ServiceBatch::new();
        back.install(&mut DeploymentItemContext::new(&mut batch))
            .unwrap();
        assert_eq!(batch.len(), 2);
    }
}
