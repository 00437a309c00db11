//! Deployment unit processor contract

use crate::context::DeploymentUnitContext;
use crate::error::DeploymentUnitProcessingError;
use std::borrow::Cow;
use std::fmt;

/// One stage of the deployment pipeline
///
/// A processor reads and mutates the context of the run it is part of and
/// may append deployment items. Returning an error stops the chain.
///
/// Processors are shared between threads through the chain, but a single
/// processor is not required to tolerate concurrent runs over distinct
/// contexts unless it says so; serializing such runs is the caller's job.
pub trait DeploymentUnitProcessor: Send + Sync {
    /// Process the deployment unit
    ///
    /// # Errors
    /// Returns an error when the unit cannot be processed further.
    fn process_deployment(
        &self,
        context: &mut DeploymentUnitContext,
    ) -> Result<(), DeploymentUnitProcessingError>;

    /// Identity of this processor within a chain
    ///
    /// Defaults to the fully qualified type name, so two instances of the
    /// same type are the same registration at a given priority.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// Processor backed by a closure with an explicit name
pub struct FnProcessor<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&mut DeploymentUnitContext) -> Result<(), DeploymentUnitProcessingError> + Send + Sync,
{
    /// Create processor
    #[inline]
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> DeploymentUnitProcessor for FnProcessor<F>
where
    F: Fn(&mut DeploymentUnitContext) -> Result<(), DeploymentUnitProcessingError> + Send + Sync,
{
    fn process_deployment(
        &self,
        context: &mut DeploymentUnitContext,
    ) -> Result<(), DeploymentUnitProcessingError> {
        (self.f)(context)
    }

    fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }
}

impl<F> fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcessor").field("name", &self.name).finish()
    }
}
