//! Error types for model updates

/// Update could not be applied
///
/// An update that fails leaves its target exactly as it found it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateFailed {
    /// Referenced element does not exist
    #[error("{kind} `{name}` not found")]
    NotFound {
        /// Element kind
        kind: &'static str,
        /// Element name
        name: String,
    },

    /// Element to add already exists
    #[error("{kind} `{name}` already exists")]
    AlreadyExists {
        /// Element kind
        kind: &'static str,
        /// Element name
        name: String,
    },

    /// Element is still referenced and cannot be removed
    #[error("{kind} `{name}` is in use by {users:?}")]
    InUse {
        /// Element kind
        kind: &'static str,
        /// Element name
        name: String,
        /// Referencing element names
        users: Vec<String>,
    },

    /// Field value is not acceptable
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl UpdateFailed {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
