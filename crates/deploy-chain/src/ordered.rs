//! Ordered chain entries
//!
//! Provides [`ProcessorKey`], the `(priority, name)` identity of a
//! registration, and [`OrderedProcessor`], a processor paired with its key.

use crate::error::ChainError;
use crate::processor::DeploymentUnitProcessor;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity and sort key of a chain entry
///
/// Ordered by priority, then by name. Priorities compare as signed
/// integers, so `i64::MIN` sorts before `i64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessorKey {
    priority: i64,
    name: Arc<str>,
}

impl ProcessorKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(priority: i64, name: impl Into<Arc<str>>) -> Self {
        Self {
            priority,
            name: name.into(),
        }
    }

    /// Key of `processor` registered at `priority`
    #[inline]
    #[must_use]
    pub fn of(processor: &dyn DeploymentUnitProcessor, priority: i64) -> Self {
        Self::new(priority, processor.name())
    }

    /// Priority
    #[inline]
    #[must_use]
    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Processor name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for ProcessorKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.priority, self.name)
    }
}

/// Processor registered in a chain at a priority
///
/// Equality, ordering and hashing only look at the [`ProcessorKey`]; the
/// processor instance is not part of the identity.
#[derive(Clone)]
pub struct OrderedProcessor {
    key: ProcessorKey,
    processor: Arc<dyn DeploymentUnitProcessor>,
}

impl OrderedProcessor {
    /// Create entry
    ///
    /// # Errors
    /// Returns [`ChainError::InvalidArgument`] if the processor has no name.
    pub fn new(
        processor: Arc<dyn DeploymentUnitProcessor>,
        priority: i64,
    ) -> Result<Self, ChainError> {
        let name = processor.name();
        if name.trim().is_empty() {
            return Err(ChainError::InvalidArgument(
                "processor name can not be empty".to_string(),
            ));
        }
        Ok(Self {
            key: ProcessorKey::new(priority, name),
            processor,
        })
    }

    /// Identity key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &ProcessorKey {
        &self.key
    }

    /// Priority
    #[inline]
    #[must_use]
    pub fn priority(&self) -> i64 {
        self.key.priority
    }

    /// Processor name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Registered processor
    #[inline]
    #[must_use]
    pub fn processor(&self) -> &Arc<dyn DeploymentUnitProcessor> {
        &self.processor
    }
}

impl PartialEq for OrderedProcessor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for OrderedProcessor {}

impl PartialOrd for OrderedProcessor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedProcessor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Hash for OrderedProcessor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Borrow<ProcessorKey> for OrderedProcessor {
    fn borrow(&self) -> &ProcessorKey {
        &self.key
    }
}

impl Display for OrderedProcessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.key, f)
    }
}

impl fmt::Debug for OrderedProcessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedProcessor")
            .field("priority", &self.key.priority)
            .field("name", &self.key.name)
            .finish_non_exhaustive()
    }
}
