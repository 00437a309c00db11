//! Testing utilities for the deployment chain workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use deploy_chain::{
    AttachmentKey, BatchBuilder, ClassLoader, DeploymentUnitContext, DeploymentUnitProcessingError,
    DeploymentUnitProcessor, InstallError, ServiceDefinition, ServiceDeployment,
};
use deploy_model::{HostModel, ServerElement, SocketBindingElement, SocketBindingGroupElement};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Labels of processors that ran against a context, in invocation order
pub const INVOCATIONS: AttachmentKey<Vec<String>> = AttachmentKey::new("test.invocations");

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn invocations(context: &DeploymentUnitContext) -> Vec<String> {
    context.get(&INVOCATIONS).cloned().unwrap_or_default()
}

pub fn record(context: &mut DeploymentUnitContext, label: impl Into<String>) {
    context
        .get_or_insert_with(&INVOCATIONS, Vec::new)
        .push(label.into());
}

macro_rules! recording_processor {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            calls: Arc<AtomicUsize>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn label() -> &'static str {
                $label
            }

            pub fn calls(&self) -> usize {
                self.calls.load(Ordering::SeqCst)
            }
        }

        impl DeploymentUnitProcessor for $name {
            fn process_deployment(
                &self,
                context: &mut DeploymentUnitContext,
            ) -> Result<(), DeploymentUnitProcessingError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                record(context, $label);
                Ok(())
            }
        }
    };
}

recording_processor!(AlphaProcessor, "alpha");
recording_processor!(BravoProcessor, "bravo");
recording_processor!(CharlieProcessor, "charlie");

/// Processor that records itself and then fails
#[derive(Debug, Clone)]
pub struct FailingProcessor {
    message: String,
    calls: Arc<AtomicUsize>,
}

impl FailingProcessor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeploymentUnitProcessor for FailingProcessor {
    fn process_deployment(
        &self,
        context: &mut DeploymentUnitContext,
    ) -> Result<(), DeploymentUnitProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        record(context, "failing");
        Err(DeploymentUnitProcessingError::new(self.message.clone()))
    }
}

/// Service descriptor whose install always fails after touching the batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailingServiceDeployment {
    pub loader: ClassLoader,
}

#[typetag::serde(name = "test-failing")]
impl ServiceDeployment for FailingServiceDeployment {
    fn class_loader(&self) -> ClassLoader {
        self.loader.clone()
    }

    fn install(&self, batch: &mut dyn BatchBuilder) -> Result<(), InstallError> {
        batch.add_service(ServiceDefinition::new("test.failing.partial"))?;
        Err(InstallError::Failed(format!("{} refused to install", self.loader.name())))
    }
}

/// Service descriptor whose install panics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanickingServiceDeployment {
    pub loader: ClassLoader,
}

#[typetag::serde(name = "test-panicking")]
impl ServiceDeployment for PanickingServiceDeployment {
    fn class_loader(&self) -> ClassLoader {
        self.loader.clone()
    }

    fn install(&self, _batch: &mut dyn BatchBuilder) -> Result<(), InstallError> {
        panic!("{} panicked during install", self.loader.name())
    }
}

pub fn binding(name: &str, port: u16) -> SocketBindingElement {
    SocketBindingElement::new(name, port)
}

pub fn standard_group() -> SocketBindingGroupElement {
    SocketBindingGroupElement::new("standard-sockets", "public")
        .with_binding(binding("http", 8080))
        .with_binding(binding("https", 8443))
        .with_binding(binding("management", 9990).with_interface("management"))
}

pub fn sample_host() -> HostModel {
    HostModel::new("primary")
        .with_socket_binding_group(standard_group())
        .with_socket_binding_group(SocketBindingGroupElement::new("ha-sockets", "private"))
        .with_server(ServerElement::new("server-one", "standard-sockets"))
        .with_server(ServerElement::new("server-two", "standard-sockets"))
        .with_server(ServerElement::new("server-three", "ha-sockets"))
}
