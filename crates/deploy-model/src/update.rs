//! Model update contract and runtime update context
//!
//! Provides [`ModelUpdate`], the command contract every update implements,
//! and [`UpdateContext`], the runtime state a server-level update acts on
//! when it is applied to a running server instead of a model.

use crate::element::{SocketBindingElement, SocketBindingGroupElement};
use crate::error::UpdateFailed;
use crate::server::ServerModelUpdate;
use std::collections::BTreeMap;
use std::fmt;

/// Immutable command that updates a model element of type `E`
///
/// # Contract
/// - `apply_update` checks every precondition before it mutates; on error
///   the element is unchanged
/// - for an update `u` that applied to `e`, `u.compensating_update(&e)`
///   applied to the result restores `e`
pub trait ModelUpdate<E>: fmt::Debug + Sized {
    /// Result produced by a successful application
    type Output;

    /// Apply this update to `element`
    ///
    /// # Errors
    /// Returns [`UpdateFailed`] if a precondition does not hold.
    fn apply_update(&self, element: &mut E) -> Result<Self::Output, UpdateFailed>;

    /// Update that undoes this one, computed against the pre-update state
    ///
    /// # Errors
    /// Returns [`UpdateFailed`] if `original` is not a state this update
    /// could have been applied to.
    fn compensating_update(&self, original: &E) -> Result<Self, UpdateFailed>;

    /// Server-level projection of this update, if servers are affected
    fn server_model_update(&self) -> Option<ServerModelUpdate>;
}

/// Receives the outcome of a runtime update
pub trait UpdateResultHandler<R, P> {
    /// Update applied
    fn handle_success(&mut self, result: R, param: P);

    /// Update rejected
    fn handle_failure(&mut self, cause: UpdateFailed, param: P);
}

/// Handler that keeps every outcome in arrival order
#[derive(Debug)]
pub struct UpdateResults<R, P> {
    outcomes: Vec<(P, Result<R, UpdateFailed>)>,
}

impl<R, P> UpdateResults<R, P> {
    /// Create empty collector
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    /// Outcomes in arrival order
    #[must_use]
    pub fn outcomes(&self) -> &[(P, Result<R, UpdateFailed>)] {
        &self.outcomes
    }

    /// Number of failed outcomes
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }
}

impl<R, P> Default for UpdateResults<R, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> UpdateResultHandler<R, P> for UpdateResults<R, P> {
    fn handle_success(&mut self, result: R, param: P) {
        self.outcomes.push((param, Ok(result)));
    }

    fn handle_failure(&mut self, cause: UpdateFailed, param: P) {
        self.outcomes.push((param, Err(cause)));
    }
}

/// Socket a running server has open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSocket {
    /// Interface the socket is bound to
    pub interface: String,
    /// Effective port, offset applied
    pub port: u16,
    /// Whether the offset was ignored
    pub fixed_port: bool,
}

/// Runtime socket state of a server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateContext {
    default_interface: String,
    port_offset: u16,
    bound: BTreeMap<String, BoundSocket>,
}

impl UpdateContext {
    /// Create context with nothing bound
    #[must_use]
    pub fn new(default_interface: impl Into<String>) -> Self {
        Self {
            default_interface: default_interface.into(),
            port_offset: 0,
            bound: BTreeMap::new(),
        }
    }

    /// Set offset added to non-fixed ports
    #[must_use]
    pub fn with_port_offset(mut self, offset: u16) -> Self {
        self.port_offset = offset;
        self
    }

    /// Boot runtime state from a binding group
    ///
    /// # Errors
    /// Returns [`UpdateFailed`] if two bindings collide at runtime.
    pub fn from_group(group: &SocketBindingGroupElement, port_offset: u16) -> Result<Self, UpdateFailed> {
        let mut context = Self::new(group.default_interface.clone()).with_port_offset(port_offset);
        for binding in group.bindings.values() {
            context.bind(binding)?;
        }
        Ok(context)
    }

    /// Interface used by bindings without an override
    #[inline]
    #[must_use]
    pub fn default_interface(&self) -> &str {
        &self.default_interface
    }

    pub(crate) fn set_default_interface(&mut self, interface: impl Into<String>) -> String {
        std::mem::replace(&mut self.default_interface, interface.into())
    }

    /// Offset added to non-fixed ports
    #[inline]
    #[must_use]
    pub fn port_offset(&self) -> u16 {
        self.port_offset
    }

    /// Runtime socket for a binding
    #[inline]
    #[must_use]
    pub fn bound(&self, name: &str) -> Option<&BoundSocket> {
        self.bound.get(name)
    }

    /// Names of bound sockets, sorted
    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.bound.keys().map(String::as_str)
    }

    /// Effective port for a binding under this context
    ///
    /// # Errors
    /// Returns [`UpdateFailed::InvalidValue`] if the offset overflows.
    pub fn effective_port(&self, binding: &SocketBindingElement) -> Result<u16, UpdateFailed> {
        if binding.fixed_port {
            return Ok(binding.port);
        }
        binding.port.checked_add(self.port_offset).ok_or_else(|| {
            UpdateFailed::invalid(
                "port",
                format!("{} plus offset {} exceeds 65535", binding.port, self.port_offset),
            )
        })
    }

    /// Open the socket described by `binding`
    ///
    /// # Errors
    /// Returns [`UpdateFailed`] if the name is already bound or the
    /// interface and port are taken.
    pub fn bind(&mut self, binding: &SocketBindingElement) -> Result<(), UpdateFailed> {
        if self.bound.contains_key(&binding.name) {
            return Err(UpdateFailed::already_exists("socket", &binding.name));
        }
        let socket = BoundSocket {
            interface: binding
                .interface
                .clone()
                .unwrap_or_else(|| self.default_interface.clone()),
            port: self.effective_port(binding)?,
            fixed_port: binding.fixed_port,
        };
        self.check_free(&binding.name, &socket)?;
        self.bound.insert(binding.name.clone(), socket);
        Ok(())
    }

    /// Close the socket for `name`
    ///
    /// # Errors
    /// Returns [`UpdateFailed::NotFound`] if nothing is bound under `name`.
    pub fn unbind(&mut self, name: &str) -> Result<BoundSocket, UpdateFailed> {
        self.bound
            .remove(name)
            .ok_or_else(|| UpdateFailed::not_found("socket", name))
    }

    /// Move the socket for `name` to `port` (before offset)
    ///
    /// # Errors
    /// Returns [`UpdateFailed`] if nothing is bound or the new port is taken.
    pub fn rebind_port(&mut self, name: &str, port: u16) -> Result<(), UpdateFailed> {
        let current = self
            .bound
            .get(name)
            .ok_or_else(|| UpdateFailed::not_found("socket", name))?;
        let candidate = SocketBindingElement {
            name: name.to_string(),
            interface: Some(current.interface.clone()),
            port,
            fixed_port: current.fixed_port,
        };
        let socket = BoundSocket {
            interface: current.interface.clone(),
            port: self.effective_port(&candidate)?,
            fixed_port: current.fixed_port,
        };
        self.check_free(name, &socket)?;
        self.bound.insert(name.to_string(), socket);
        Ok(())
    }

    fn check_free(&self, name: &str, socket: &BoundSocket) -> Result<(), UpdateFailed> {
        match self
            .bound
            .iter()
            .find(|(other, bound)| {
                other.as_str() != name
                    && bound.interface == socket.interface
                    && bound.port == socket.port
            })
        {
            Some((other, _)) => Err(UpdateFailed::invalid(
                "port",
                format!(
                    "{}:{} is already bound by `{other}`",
                    socket.interface, socket.port
                ),
            )),
            None => Ok(()),
        }
    }
}
