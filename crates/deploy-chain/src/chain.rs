//! Deployment chain
//!
//! Provides [`DeploymentChain`], which runs registered processors against a
//! deployment unit context in `(priority, name)` order.
//!
//! # Snapshots
//! Membership lives in a persistent ordered set. Registration and removal
//! swap in a new version under a write lock; a run clones the current
//! version under a read lock (structural sharing, no copy of the entries)
//! and iterates it without holding any lock. A run therefore sees every
//! entry of its snapshot exactly once, regardless of concurrent writers,
//! and processors may register or remove entries mid-run.

use crate::context::{ContextId, DeploymentUnitContext};
use crate::error::ChainError;
use crate::ordered::{OrderedProcessor, ProcessorKey};
use crate::processor::DeploymentUnitProcessor;
use im::OrdSet;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, debug_span, trace, warn};

/// Priority-ordered chain of deployment unit processors
pub struct DeploymentChain {
    name: String,
    processors: RwLock<OrdSet<OrderedProcessor>>,
    active_runs: Mutex<HashSet<ContextId>>,
}

impl DeploymentChain {
    /// Create empty chain
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processors: RwLock::new(OrdSet::new()),
            active_runs: Mutex::new(HashSet::new()),
        }
    }

    /// Chain name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `processor` at `priority`
    ///
    /// # Errors
    /// - [`ChainError::DuplicateRegistration`] if an entry with the same
    ///   name and priority exists; membership is unchanged
    /// - [`ChainError::InvalidArgument`] if the processor has no name
    pub fn add_processor(
        &self,
        processor: Arc<dyn DeploymentUnitProcessor>,
        priority: i64,
    ) -> Result<(), ChainError> {
        let entry = OrderedProcessor::new(processor, priority)?;
        let mut processors = self.processors.write();
        if processors.contains(entry.key()) {
            return Err(ChainError::DuplicateRegistration {
                name: entry.name().to_string(),
                priority,
            });
        }
        debug!(chain = %self.name, processor = %entry.name(), priority, "processor registered");
        processors.insert(entry);
        Ok(())
    }

    /// Remove the entry registered for `processor` at `priority`
    ///
    /// Absent entries are ignored. Returns whether an entry was removed.
    pub fn remove_processor(&self, processor: &dyn DeploymentUnitProcessor, priority: i64) -> bool {
        let key = ProcessorKey::of(processor, priority);
        let removed = self.processors.write().remove(&key).is_some();
        if removed {
            debug!(chain = %self.name, processor = %key.name(), priority, "processor removed");
        }
        removed
    }

    /// Check if an entry with this name and priority is registered
    #[must_use]
    pub fn contains(&self, name: &str, priority: i64) -> bool {
        self.processors
            .read()
            .contains(&ProcessorKey::new(priority, name))
    }

    /// Current entries in run order
    #[must_use]
    pub fn entries(&self) -> Vec<ProcessorKey> {
        self.snapshot().iter().map(|e| e.key().clone()).collect()
    }

    /// Get number of registered entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.read().len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.read().is_empty()
    }

    /// Consistent view of the current membership
    fn snapshot(&self) -> OrdSet<OrderedProcessor> {
        self.processors.read().clone()
    }

    /// Run every registered processor against `context` in order
    ///
    /// The first processor failure stops the run: it is returned unchanged
    /// and no later processor is invoked. Whatever earlier processors did to
    /// the context stays in place.
    ///
    /// # Errors
    /// - [`ChainError::Processing`] with the failing processor's error
    /// - [`ChainError::ReentrantRun`] if this chain is already processing
    ///   `context`
    pub fn process_deployment(&self, context: &mut DeploymentUnitContext) -> Result<(), ChainError> {
        let _run = RunGuard::enter(&self.active_runs, context.id()).ok_or_else(|| {
            ChainError::ReentrantRun {
                chain: self.name.clone(),
            }
        })?;

        let processors = self.snapshot();
        let span = debug_span!("process_deployment", chain = %self.name, deployment = %context.name());
        let _entered = span.enter();

        for entry in processors.iter() {
            trace!(processor = %entry.name(), priority = entry.priority(), "invoking processor");
            if let Err(err) = entry.processor().process_deployment(context) {
                warn!(
                    processor = %entry.name(),
                    priority = entry.priority(),
                    error = %err,
                    "processor failed, aborting chain"
                );
                return Err(ChainError::Processing(err));
            }
        }

        debug!(processors = processors.len(), items = context.items().len(), "deployment processed");
        Ok(())
    }
}

impl Display for DeploymentChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let processors = self.snapshot();
        write!(f, "DeploymentChain{{name={}, processors=[", self.name)?;
        for (i, entry) in processors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(entry, f)?;
        }
        f.write_str("]}")
    }
}

impl fmt::Debug for DeploymentChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentChain")
            .field("name", &self.name)
            .field("processors", &self.entries())
            .finish_non_exhaustive()
    }
}

/// Marks a context as being processed by a chain for the guard's lifetime
struct RunGuard<'a> {
    active: &'a Mutex<HashSet<ContextId>>,
    id: ContextId,
}

impl<'a> RunGuard<'a> {
    fn enter(active: &'a Mutex<HashSet<ContextId>>, id: ContextId) -> Option<Self> {
        let inserted = active.lock().insert(id);
        inserted.then(|| Self { active, id })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AttachmentKey;
    use crate::error::DeploymentUnitProcessingError;
    use crate::processor::FnProcessor;
    use pretty_assertions::assert_eq;

    const TRAIL: AttachmentKey<Vec<&'static str>> = AttachmentKey::new("trail");

    fn marker(name: &'static str) -> Arc<dyn DeploymentUnitProcessor> {
        Arc::new(FnProcessor::new(name, move |ctx: &mut DeploymentUnitContext| {
            ctx.get_or_insert_with(&TRAIL, Vec::new).push(name);
            Ok(())
        }))
    }

    fn trail(ctx: &DeploymentUnitContext) -> Vec<&'static str> {
        ctx.get(&TRAIL).cloned().unwrap_or_default()
    }

    #[test]
    fn empty_chain_runs_cleanly() {
        let chain = DeploymentChain::new("empty");
        let mut ctx = DeploymentUnitContext::new("app.war");
        chain.process_deployment(&mut ctx).unwrap();
        assert!(chain.is_empty());
        assert!(trail(&ctx).is_empty());
    }

    #[test]
    fn runs_in_priority_then_name_order() {
        let chain = DeploymentChain::new("ordered");
        chain.add_processor(marker("c"), 10).unwrap();
        chain.add_processor(marker("b"), 20).unwrap();
        chain.add_processor(marker("a"), 10).unwrap();

        let mut ctx = DeploymentUnitContext::new("app.war");
        chain.process_deployment(&mut ctx).unwrap();
        assert_eq!(trail(&ctx), vec!["a", "c", "b"]);
    }

    #[test]
    fn duplicate_leaves_membership_unchanged() {
        let chain = DeploymentChain::new("dups");
        chain.add_processor(marker("p"), 7).unwrap();
        let err = chain.add_processor(marker("p"), 7).unwrap_err();

        assert!(matches!(
            err,
            ChainError::DuplicateRegistration { ref name, priority: 7 } if name == "p"
        ));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn same_processor_at_distinct_priorities() {
        let chain = DeploymentChain::new("twice");
        let p = marker("p");
        chain.add_processor(Arc::clone(&p), 1).unwrap();
        chain.add_processor(p, 2).unwrap();

        let mut ctx = DeploymentUnitContext::new("app.war");
        chain.process_deployment(&mut ctx).unwrap();
        assert_eq!(trail(&ctx), vec!["p", "p"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let chain = DeploymentChain::new("remove");
        let p = marker("p");
        chain.add_processor(Arc::clone(&p), 5).unwrap();

        assert!(chain.remove_processor(p.as_ref(), 5));
        assert!(!chain.remove_processor(p.as_ref(), 5));
        assert!(!chain.remove_processor(p.as_ref(), 6));
        assert!(chain.is_empty());
    }

    #[test]
    fn display_lists_entries_in_order() {
        let chain = DeploymentChain::new("main");
        chain.add_processor(marker("late"), 100).unwrap();
        chain.add_processor(marker("early"), -1).unwrap();
        assert_eq!(
            chain.to_string(),
            "DeploymentChain{name=main, processors=[-1 => early, 100 => late]}"
        );
    }

    #[test]
    fn registration_during_run_is_not_seen_by_that_run() {
        let chain = Arc::new(DeploymentChain::new("live"));
        let registrar = {
            let chain = Arc::downgrade(&chain);
            FnProcessor::new("registrar", move |ctx: &mut DeploymentUnitContext| {
                ctx.get_or_insert_with(&TRAIL, Vec::new).push("registrar");
                if let Some(chain) = chain.upgrade() {
                    let _ = chain.add_processor(marker("late"), 50);
                }
                Ok(())
            })
        };
        chain.add_processor(Arc::new(registrar), 1).unwrap();

        let mut first = DeploymentUnitContext::new("first");
        chain.process_deployment(&mut first).unwrap();
        assert_eq!(trail(&first), vec!["registrar"]);

        let mut second = DeploymentUnitContext::new("second");
        chain.process_deployment(&mut second).unwrap();
        assert_eq!(trail(&second), vec!["registrar", "late"]);
    }

    #[test]
    fn reentrant_run_with_same_context_is_rejected() {
        let chain = Arc::new(DeploymentChain::new("reentrant"));
        let weak = Arc::downgrade(&chain);
        let reenter = FnProcessor::new("reenter", move |ctx: &mut DeploymentUnitContext| {
            let chain = weak.upgrade().expect("chain alive");
            match chain.process_deployment(ctx) {
                Err(ChainError::ReentrantRun { .. }) => Ok(()),
                other => Err(DeploymentUnitProcessingError::new(format!(
                    "unexpected nested result: {other:?}"
                ))),
            }
        });
        chain.add_processor(Arc::new(reenter), 1).unwrap();

        let mut ctx = DeploymentUnitContext::new("app.war");
        chain.process_deployment(&mut ctx).unwrap();
        // The guard is released, so a later run with the same context works.
        chain.process_deployment(&mut ctx).unwrap();
    }
}
