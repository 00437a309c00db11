//! Ambient per-thread context loader
//!
//! A [`ClassLoader`] names the module scope a service descriptor was loaded
//! from. Each thread carries one ambient loader; [`ContextLoaderScope`] is
//! the only supported way to rebind it temporarily.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};
use std::marker::PhantomData;

const SYSTEM_LOADER: &str = "system";

thread_local! {
    static CONTEXT_LOADER: RefCell<ClassLoader> = RefCell::new(ClassLoader::system());
}

/// Named loader handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLoader {
    name: String,
}

impl ClassLoader {
    /// Create loader handle with the given module name
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Loader every thread starts with
    #[inline]
    #[must_use]
    pub fn system() -> Self {
        Self::named(SYSTEM_LOADER)
    }

    /// Module name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if this is the system loader
    #[inline]
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.name == SYSTEM_LOADER
    }
}

impl Default for ClassLoader {
    fn default() -> Self {
        Self::system()
    }
}

impl Display for ClassLoader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ClassLoader({})", self.name)
    }
}

/// Loader currently bound to this thread
#[must_use]
pub fn context_loader() -> ClassLoader {
    CONTEXT_LOADER.with(|loader| loader.borrow().clone())
}

/// Bind `loader` to this thread, returning the previous binding
pub fn set_context_loader(loader: ClassLoader) -> ClassLoader {
    CONTEXT_LOADER.with(|current| current.replace(loader))
}

/// Scoped rebinding of the thread's context loader
///
/// The previous loader is restored when the scope is dropped, whether the
/// enclosing code returns normally, propagates an error, or unwinds.
/// The guard is `!Send`: it must be dropped on the thread that created it.
#[derive(Debug)]
#[must_use = "the previous loader is restored as soon as the scope is dropped"]
pub struct ContextLoaderScope {
    previous: Option<ClassLoader>,
    _thread_bound: PhantomData<*const ()>,
}

impl ContextLoaderScope {
    /// Bind `loader` until the returned scope is dropped
    pub fn enter(loader: ClassLoader) -> Self {
        let previous = set_context_loader(loader);
        Self {
            previous: Some(previous),
            _thread_bound: PhantomData,
        }
    }

    /// Loader that will be restored on drop
    #[inline]
    #[must_use]
    pub fn previous(&self) -> Option<&ClassLoader> {
        self.previous.as_ref()
    }
}

impl Drop for ContextLoaderScope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            set_context_loader(previous);
        }
    }
}
