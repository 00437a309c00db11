//! Deployment installation
//!
//! Runs a chain over a context, then installs the produced deployment items
//! into the context's batch builder in the order they were produced.

use crate::batch::BatchBuilder;
use crate::chain::DeploymentChain;
use crate::context::DeploymentUnitContext;
use crate::error::DeployError;
use crate::item::{DeploymentItem, DeploymentItemContext};
use tracing::{info, warn};

/// Outcome of a successful deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeploymentSummary {
    /// Number of deployment items installed
    pub items_installed: usize,
}

/// Install `items` into `batch` in order
///
/// Stops at the first failing item; items before it stay installed and
/// items after it are not attempted.
///
/// # Errors
/// Returns [`DeployError::Install`] naming the failing item's position.
pub fn install_items(
    items: &[Box<dyn DeploymentItem>],
    batch: &mut dyn BatchBuilder,
) -> Result<usize, DeployError> {
    let mut context = DeploymentItemContext::new(batch);
    for (index, item) in items.iter().enumerate() {
        item.install(&mut context).map_err(|source| {
            warn!(index, item = ?item, error = %source, "deployment item failed to install");
            DeployError::Install { index, source }
        })?;
    }
    Ok(items.len())
}

/// Process `context` with `chain`, then install its items
///
/// The batch lock is taken per item and released before the next one, so
/// the handle is free between installs. An item must not lock the
/// context's own batch handle from inside `install`; it already holds it.
///
/// When an item fails, it and every item after it are put back into the
/// context in their original order, so the caller can inspect, retry or
/// discard them.
///
/// # Errors
/// - [`DeployError::Processing`] if the chain run fails; nothing is installed
/// - [`DeployError::MissingBatchBuilder`] if the context has no batch builder
/// - [`DeployError::Install`] if an item fails to install
pub fn deploy(
    chain: &DeploymentChain,
    context: &mut DeploymentUnitContext,
) -> Result<DeploymentSummary, DeployError> {
    chain.process_deployment(context)?;

    let batch = context
        .batch_builder()
        .cloned()
        .ok_or_else(|| DeployError::MissingBatchBuilder(context.name().to_string()))?;
    let mut items = context.take_items();

    let failure = items.iter().enumerate().find_map(|(index, item)| {
        let mut builder = batch.lock();
        let installed = item.install(&mut DeploymentItemContext::new(&mut *builder));
        installed.err().map(|source| (index, source))
    });
    if let Some((index, source)) = failure {
        let pending = items.split_off(index);
        warn!(
            deployment = %context.name(),
            index,
            pending = pending.len(),
            error = %source,
            "deployment item failed to install"
        );
        for item in pending {
            context.add_boxed_item(item);
        }
        return Err(DeployError::Install { index, source });
    }

    let items_installed = items.len();
    info!(deployment = %context.name(), items = items_installed, "deployment installed");
    Ok(DeploymentSummary { items_installed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ServiceBatch, ServiceDefinition};
    use crate::item::{ServiceDeploymentItem, StaticServiceDeployment};
    use crate::loader::ClassLoader;
    use crate::processor::FnProcessor;
    use std::sync::Arc;

    fn item(loader: &str, services: &[&str]) -> ServiceDeploymentItem {
        let deployment = services.iter().fold(
            StaticServiceDeployment::new(ClassLoader::named(loader)),
            |d, name| d.with_service(ServiceDefinition::new(*name)),
        );
        ServiceDeploymentItem::new(deployment)
    }

    #[test]
    fn install_items_stops_at_first_failure() {
        let items: Vec<Box<dyn DeploymentItem>> = vec![
            Box::new(item("a", &["one"])),
            Box::new(item("b", &["one"])),
            Box::new(item("c", &["two"])),
        ];
        let mut batch = ServiceBatch::new();

        let err = install_items(&items, &mut batch).unwrap_err();
        assert!(matches!(err, DeployError::Install { index: 1, .. }));
        assert_eq!(batch.service_names(), vec!["one"]);
    }

    #[test]
    fn deploy_installs_produced_items() {
        let chain = DeploymentChain::new("main");
        chain
            .add_processor(
                Arc::new(FnProcessor::new("emit", |ctx: &mut DeploymentUnitContext| {
                    ctx.add_item(item("app.war", &["web", "db"]));
                    Ok(())
                })),
                0,
            )
            .unwrap();

        let batch = ServiceBatch::shared();
        let mut ctx = DeploymentUnitContext::new("app.war").with_batch_builder(batch.clone());

        let summary = deploy(&chain, &mut ctx).unwrap();
        assert_eq!(summary.items_installed, 1);
        assert!(ctx.items().is_empty());
        assert_eq!(batch.lock().service_names(), vec!["web", "db"]);
    }

    #[test]
    fn deploy_without_batch_builder_fails() {
        let chain = DeploymentChain::new("main");
        let mut ctx = DeploymentUnitContext::new("bare.jar");
        let err = deploy(&chain, &mut ctx).unwrap_err();
        assert!(matches!(err, DeployError::MissingBatchBuilder(name) if name == "bare.jar"));
    }

    #[test]
    fn failed_install_returns_pending_items_to_context() {
        let chain = DeploymentChain::new("main");
        chain
            .add_processor(
                Arc::new(FnProcessor::new("emit", |ctx: &mut DeploymentUnitContext| {
                    ctx.add_item(item("a", &["one"]));
                    ctx.add_item(item("b", &["one"]));
                    ctx.add_item(item("c", &["two"]));
                    Ok(())
                })),
                0,
            )
            .unwrap();

        let batch = ServiceBatch::shared();
        let mut ctx = DeploymentUnitContext::new("app.war").with_batch_builder(batch.clone());

        let err = deploy(&chain, &mut ctx).unwrap_err();
        assert!(matches!(err, DeployError::Install { index: 1, .. }));
        assert_eq!(batch.lock().service_names(), vec!["one"]);
        assert!(batch.try_lock().is_some());

        let pending = ctx.take_items();
        assert_eq!(pending.len(), 2);
        let mut retry = ServiceBatch::new();
        assert_eq!(install_items(&pending, &mut retry).unwrap(), 2);
        assert_eq!(retry.service_names(), vec!["one", "two"]);
    }
}
