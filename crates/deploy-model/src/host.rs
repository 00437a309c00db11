//! Host-level updates
//!
//! Provides [`HostModelUpdate`]. Besides editing the [`HostModel`], each
//! update reports which of the host's servers it affects, so the caller
//! can push the projected [`ServerModelUpdate`] to exactly those servers.

use crate::element::{HostModel, ServerElement, SocketBindingGroupElement};
use crate::error::UpdateFailed;
use crate::server::ServerModelUpdate;
use crate::socket::SocketBindingUpdate;
use crate::update::ModelUpdate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Update to a host model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum HostModelUpdate {
    /// Declare a new server
    AddServer(ServerElement),
    /// Remove a server declaration
    RemoveServer {
        /// Server name
        name: String,
    },
    /// Edit a socket binding group
    SocketBindingGroup {
        /// Group name
        group: String,
        /// Edit to apply
        update: SocketBindingUpdate,
    },
    /// Declare a new socket binding group
    AddSocketBindingGroup(SocketBindingGroupElement),
    /// Remove an unused socket binding group
    RemoveSocketBindingGroup {
        /// Group name
        name: String,
    },
}

impl HostModelUpdate {
    /// Servers of `host` whose running configuration this update changes
    ///
    /// Adding or removing declarations affects no running server.
    #[must_use]
    pub fn affected_servers(&self, host: &HostModel) -> Vec<String> {
        match self {
            Self::SocketBindingGroup { group, .. } => host.servers_using_group(group),
            Self::AddServer(_)
            | Self::RemoveServer { .. }
            | Self::AddSocketBindingGroup(_)
            | Self::RemoveSocketBindingGroup { .. } => Vec::new(),
        }
    }

    fn validate(&self, host: &HostModel) -> Result<(), UpdateFailed> {
        match self {
            Self::AddServer(server) => {
                if server.name.is_empty() {
                    return Err(UpdateFailed::invalid("name", "server name can not be empty"));
                }
                if host.servers.contains_key(&server.name) {
                    return Err(UpdateFailed::already_exists("server", &server.name));
                }
                if !host
                    .socket_binding_groups
                    .contains_key(&server.socket_binding_group)
                {
                    return Err(UpdateFailed::not_found(
                        "socket binding group",
                        &server.socket_binding_group,
                    ));
                }
            }
            Self::RemoveServer { name } => {
                if !host.servers.contains_key(name) {
                    return Err(UpdateFailed::not_found("server", name));
                }
            }
            Self::SocketBindingGroup { group, .. } => {
                if !host.socket_binding_groups.contains_key(group) {
                    return Err(UpdateFailed::not_found("socket binding group", group));
                }
            }
            Self::AddSocketBindingGroup(group) => {
                if group.name.is_empty() {
                    return Err(UpdateFailed::invalid("name", "group name can not be empty"));
                }
                if host.socket_binding_groups.contains_key(&group.name) {
                    return Err(UpdateFailed::already_exists("socket binding group", &group.name));
                }
            }
            Self::RemoveSocketBindingGroup { name } => {
                if !host.socket_binding_groups.contains_key(name) {
                    return Err(UpdateFailed::not_found("socket binding group", name));
                }
                let users = host.servers_using_group(name);
                if !users.is_empty() {
                    return Err(UpdateFailed::InUse {
                        kind: "socket binding group",
                        name: name.clone(),
                        users,
                    });
                }
            }
        }
        Ok(())
    }
}

impl ModelUpdate<HostModel> for HostModelUpdate {
    type Output = ();

    fn apply_update(&self, host: &mut HostModel) -> Result<(), UpdateFailed> {
        self.validate(host)?;
        match self {
            Self::AddServer(server) => {
                host.servers.insert(server.name.clone(), server.clone());
            }
            Self::RemoveServer { name } => {
                host.servers.remove(name);
            }
            Self::SocketBindingGroup { group, update } => {
                let element = host
                    .socket_binding_groups
                    .get_mut(group)
                    .ok_or_else(|| UpdateFailed::not_found("socket binding group", group))?;
                update.apply_update(element)?;
            }
            Self::AddSocketBindingGroup(group) => {
                host.socket_binding_groups
                    .insert(group.name.clone(), group.clone());
            }
            Self::RemoveSocketBindingGroup { name } => {
                host.socket_binding_groups.remove(name);
            }
        }
        debug!(host = %host.name, update = ?self, "applied host model update");
        Ok(())
    }

    fn compensating_update(&self, original: &HostModel) -> Result<Self, UpdateFailed> {
        self.validate(original)?;
        Ok(match self {
            Self::AddServer(server) => Self::RemoveServer {
                name: server.name.clone(),
            },
            Self::RemoveServer { name } => Self::AddServer(
                original
                    .servers
                    .get(name)
                    .cloned()
                    .ok_or_else(|| UpdateFailed::not_found("server", name))?,
            ),
            Self::SocketBindingGroup { group, update } => {
                let element = original
                    .socket_binding_groups
                    .get(group)
                    .ok_or_else(|| UpdateFailed::not_found("socket binding group", group))?;
                Self::SocketBindingGroup {
                    group: group.clone(),
                    update: update.compensating_update(element)?,
                }
            }
            Self::AddSocketBindingGroup(group) => Self::RemoveSocketBindingGroup {
                name: group.name.clone(),
            },
            Self::RemoveSocketBindingGroup { name } => Self::AddSocketBindingGroup(
                original
                    .socket_binding_groups
                    .get(name)
                    .cloned()
                    .ok_or_else(|| UpdateFailed::not_found("socket binding group", name))?,
            ),
        })
    }

    fn server_model_update(&self) -> Option<ServerModelUpdate> {
        match self {
            Self::SocketBindingGroup { update, .. } => update.server_model_update(),
            _ => None,
        }
    }
}
