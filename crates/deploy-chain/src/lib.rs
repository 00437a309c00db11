//! Deployment Chain
//!
//! Priority-ordered processing of deployment units.
//!
//! # Core Concepts
//!
//! - [`DeploymentUnitContext`]: Per-run attribute store and item accumulator
//! - [`DeploymentUnitProcessor`]: One stage of the pipeline
//! - [`OrderedProcessor`]: A processor paired with its `(priority, name)` key
//! - [`DeploymentChain`]: Concurrent ordered set of processors with snapshot runs
//! - [`DeploymentItem`]: Serializable descriptor installed into a [`BatchBuilder`]
//! - [`ContextLoaderScope`]: Scoped rebinding of the thread's context loader
//!
//! # Example
//!
//! ```rust,ignore
//! use deploy_chain::{deploy, DeploymentChain, DeploymentUnitContext, ServiceBatch};
//! use std::sync::Arc;
//!
//! let chain = DeploymentChain::new("default");
//! chain.add_processor(Arc::new(ParseManifest), 100)?;
//! chain.add_processor(Arc::new(EmitServices), 200)?;
//!
//! let batch = ServiceBatch::shared();
//! let mut context = DeploymentUnitContext::new("app.war").with_batch_builder(batch.clone());
//! let summary = deploy(&chain, &mut context)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod batch;
mod chain;
mod config;
mod context;
mod error;
mod installer;
mod item;
mod loader;
mod ordered;
mod processor;

// Re-exports
pub use batch::{BatchBuilder, BatchHandle, InstalledService, ServiceBatch, ServiceDefinition};
pub use chain::DeploymentChain;
pub use config::{ChainConfig, PriorityValue, ProcessorBinding, ProcessorCatalog};
pub use context::{AttachmentKey, ContextId, DeploymentUnitContext};
pub use error::{ChainError, ConfigError, DeployError, DeploymentUnitProcessingError, InstallError};
pub use installer::{deploy, install_items, DeploymentSummary};
pub use item::{
    DeploymentItem, DeploymentItemContext, ServiceDeployment, ServiceDeploymentItem,
    StaticServiceDeployment,
};
pub use loader::{context_loader, set_context_loader, ClassLoader, ContextLoaderScope};
pub use ordered::{OrderedProcessor, ProcessorKey};
pub use processor::{DeploymentUnitProcessor, FnProcessor};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
