//! Socket binding updates
//!
//! Provides [`SocketBindingUpdate`], which edits a socket binding group,
//! and [`ServerSocketBindingUpdate`], its server-level projection that runs
//! either against a [`ServerModel`] or against a running server's
//! [`UpdateContext`].

use crate::element::{ServerModel, SocketBindingElement, SocketBindingGroupElement};
use crate::error::UpdateFailed;
use crate::server::ServerModelUpdate;
use crate::update::{ModelUpdate, UpdateContext, UpdateResultHandler};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Update to a socket binding group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum SocketBindingUpdate {
    /// Add a new binding
    Add(SocketBindingElement),
    /// Remove a binding
    Remove {
        /// Binding name
        name: String,
    },
    /// Change a binding's port
    SetPort {
        /// Binding name
        name: String,
        /// New port
        port: u16,
    },
    /// Change the group's default interface
    SetDefaultInterface {
        /// New default interface
        interface: String,
    },
}

impl SocketBindingUpdate {
    /// Name of the binding this update targets, if any
    #[must_use]
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Self::Add(binding) => Some(&binding.name),
            Self::Remove { name } | Self::SetPort { name, .. } => Some(name),
            Self::SetDefaultInterface { .. } => None,
        }
    }

    fn validate(&self, group: &SocketBindingGroupElement) -> Result<(), UpdateFailed> {
        match self {
            Self::Add(binding) => {
                if binding.name.is_empty() {
                    return Err(UpdateFailed::invalid("name", "binding name can not be empty"));
                }
                if group.bindings.contains_key(&binding.name) {
                    return Err(UpdateFailed::already_exists("socket binding", &binding.name));
                }
            }
            Self::Remove { name } | Self::SetPort { name, .. } => {
                if !group.bindings.contains_key(name) {
                    return Err(UpdateFailed::not_found("socket binding", name));
                }
            }
            Self::SetDefaultInterface { interface } => {
                if interface.is_empty() {
                    return Err(UpdateFailed::invalid(
                        "interface",
                        "default interface can not be empty",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Apply to a running server
    ///
    /// The outcome goes to `handler` together with `param`. Changing the
    /// default interface only affects sockets bound afterwards.
    pub fn apply_runtime<P>(
        &self,
        context: &mut UpdateContext,
        handler: &mut dyn UpdateResultHandler<(), P>,
        param: P,
    ) {
        let outcome = match self {
            Self::Add(binding) => context.bind(binding),
            Self::Remove { name } => context.unbind(name).map(drop),
            Self::SetPort { name, port } => context.rebind_port(name, *port),
            Self::SetDefaultInterface { interface } => {
                if interface.is_empty() {
                    Err(UpdateFailed::invalid(
                        "interface",
                        "default interface can not be empty",
                    ))
                } else {
                    context.set_default_interface(interface.clone());
                    Ok(())
                }
            }
        };
        match outcome {
            Ok(()) => handler.handle_success((), param),
            Err(cause) => {
                debug!(update = ?self, %cause, "runtime socket binding update rejected");
                handler.handle_failure(cause, param);
            }
        }
    }
}

impl ModelUpdate<SocketBindingGroupElement> for SocketBindingUpdate {
    type Output = ();

    fn apply_update(&self, group: &mut SocketBindingGroupElement) -> Result<(), UpdateFailed> {
        self.validate(group)?;
        match self {
            Self::Add(binding) => {
                group.bindings.insert(binding.name.clone(), binding.clone());
            }
            Self::Remove { name } => {
                group.bindings.remove(name);
            }
            Self::SetPort { name, port } => {
                if let Some(binding) = group.bindings.get_mut(name) {
                    binding.port = *port;
                }
            }
            Self::SetDefaultInterface { interface } => {
                group.default_interface.clone_from(interface);
            }
        }
        debug!(group = %group.name, update = ?self, "applied socket binding update");
        Ok(())
    }

    fn compensating_update(&self, original: &SocketBindingGroupElement) -> Result<Self, UpdateFailed> {
        self.validate(original)?;
        let missing = |name: &str| UpdateFailed::not_found("socket binding", name);
        Ok(match self {
            Self::Add(binding) => Self::Remove {
                name: binding.name.clone(),
            },
            Self::Remove { name } => Self::Add(original.binding(name).cloned().ok_or_else(|| missing(name))?),
            Self::SetPort { name, .. } => Self::SetPort {
                name: name.clone(),
                port: original.binding(name).ok_or_else(|| missing(name))?.port,
            },
            Self::SetDefaultInterface { .. } => Self::SetDefaultInterface {
                interface: original.default_interface.clone(),
            },
        })
    }

    fn server_model_update(&self) -> Option<ServerModelUpdate> {
        Some(ServerModelUpdate::SocketBinding(ServerSocketBindingUpdate::new(
            self.clone(),
        )))
    }
}

/// Socket binding update applied at server level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSocketBindingUpdate {
    update: SocketBindingUpdate,
}

impl ServerSocketBindingUpdate {
    /// Create new server-level wrapper
    #[must_use]
    pub fn new(update: SocketBindingUpdate) -> Self {
        Self { update }
    }

    /// Wrapped update
    #[inline]
    #[must_use]
    pub fn update(&self) -> &SocketBindingUpdate {
        &self.update
    }

    /// Apply to a running server
    pub fn apply_runtime<P>(
        &self,
        context: &mut UpdateContext,
        handler: &mut dyn UpdateResultHandler<(), P>,
        param: P,
    ) {
        self.update.apply_runtime(context, handler, param);
    }
}

impl ModelUpdate<ServerModel> for ServerSocketBindingUpdate {
    type Output = ();

    fn apply_update(&self, server: &mut ServerModel) -> Result<(), UpdateFailed> {
        self.update.apply_update(&mut server.socket_bindings)
    }

    fn compensating_update(&self, original: &ServerModel) -> Result<Self, UpdateFailed> {
        self.update
            .compensating_update(&original.socket_bindings)
            .map(Self::new)
    }

    fn server_model_update(&self) -> Option<ServerModelUpdate> {
        Some(ServerModelUpdate::SocketBinding(self.clone()))
    }
}
