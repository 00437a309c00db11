//! Per-run deployment unit context
//!
//! Provides [`DeploymentUnitContext`], the mutable state shared by the
//! processors of one chain run:
//! - Typed attachments keyed by [`AttachmentKey`]
//! - An optional handle to the batch builder items will be installed into
//! - The append-only list of produced deployment items

use crate::batch::BatchHandle;
use crate::item::DeploymentItem;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a context instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Typed key for context attachments
///
/// Two keys address the same slot only when both the name and the value
/// type match.
pub struct AttachmentKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttachmentKey<T> {
    /// Create key
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Key name
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for AttachmentKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttachmentKey<T> {}

impl<T> fmt::Debug for AttachmentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttachmentKey").field(&self.name).finish()
    }
}

type Slot = (&'static str, TypeId);

/// Mutable state shared by the processors of one chain run
pub struct DeploymentUnitContext {
    id: ContextId,
    name: String,
    attachments: HashMap<Slot, Box<dyn Any + Send + Sync>>,
    batch_builder: Option<BatchHandle>,
    items: Vec<Box<dyn DeploymentItem>>,
}

impl DeploymentUnitContext {
    /// Create context for the named deployment
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ContextId::next(),
            name: name.into(),
            attachments: HashMap::new(),
            batch_builder: None,
            items: Vec::new(),
        }
    }

    /// Attach batch builder
    #[must_use]
    pub fn with_batch_builder(mut self, batch: BatchHandle) -> Self {
        self.batch_builder = Some(batch);
        self
    }

    /// Context identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Deployment name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get attachment
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &AttachmentKey<T>) -> Option<&T> {
        self.attachments
            .get(&slot(key))
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Get mutable attachment
    pub fn get_mut<T: Any + Send + Sync>(&mut self, key: &AttachmentKey<T>) -> Option<&mut T> {
        self.attachments
            .get_mut(&slot(key))
            .and_then(|value| value.downcast_mut::<T>())
    }

    /// Store attachment, returning the previous value
    pub fn put<T: Any + Send + Sync>(&mut self, key: &AttachmentKey<T>, value: T) -> Option<T> {
        self.attachments
            .insert(slot(key), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// Get attachment, inserting `f()` when absent
    pub fn get_or_insert_with<T, F>(&mut self, key: &AttachmentKey<T>, f: F) -> &mut T
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        self.attachments
            .entry(slot(key))
            .or_insert_with(|| Box::new(f()) as Box<dyn Any + Send + Sync>)
            .downcast_mut::<T>()
            .unwrap_or_else(|| unreachable!("slot type is part of the key"))
    }

    /// Remove attachment
    pub fn remove<T: Any + Send + Sync>(&mut self, key: &AttachmentKey<T>) -> Option<T> {
        self.attachments
            .remove(&slot(key))
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Check if attachment is present
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self, key: &AttachmentKey<T>) -> bool {
        self.attachments.contains_key(&slot(key))
    }

    /// Batch builder handle, if one is attached
    #[inline]
    #[must_use]
    pub fn batch_builder(&self) -> Option<&BatchHandle> {
        self.batch_builder.as_ref()
    }

    /// Replace batch builder handle
    pub fn set_batch_builder(&mut self, batch: BatchHandle) {
        self.batch_builder = Some(batch);
    }

    /// Append deployment item
    pub fn add_item(&mut self, item: impl DeploymentItem + 'static) {
        self.items.push(Box::new(item));
    }

    /// Append boxed deployment item
    pub fn add_boxed_item(&mut self, item: Box<dyn DeploymentItem>) {
        self.items.push(item);
    }

    /// Items produced so far
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[Box<dyn DeploymentItem>] {
        &self.items
    }

    /// Drain produced items for installation
    pub fn take_items(&mut self) -> Vec<Box<dyn DeploymentItem>> {
        std::mem::take(&mut self.items)
    }
}

impl fmt::Debug for DeploymentUnitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.attachments.keys().map(|(name, _)| *name).collect();
        keys.sort_unstable();
        f.debug_struct("DeploymentUnitContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("attachments", &keys)
            .field("has_batch_builder", &self.batch_builder.is_some())
            .field("items", &self.items)
            .finish()
    }
}

fn slot<T: Any>(key: &AttachmentKey<T>) -> Slot {
    (key.name, TypeId::of::<T>())
}
