//! Model elements targeted by updates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named socket within a binding group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketBindingElement {
    /// Binding name
    pub name: String,
    /// Interface override; the group default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// Port number
    pub port: u16,
    /// Whether port offsets are ignored for this binding
    #[serde(default)]
    pub fixed_port: bool,
}

impl SocketBindingElement {
    /// Create binding on the group's default interface
    #[must_use]
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            interface: None,
            port,
            fixed_port: false,
        }
    }

    /// Bind to a specific interface
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Mark port as fixed
    #[must_use]
    pub fn with_fixed_port(mut self) -> Self {
        self.fixed_port = true;
        self
    }
}

/// Group of socket bindings sharing a default interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketBindingGroupElement {
    /// Group name
    pub name: String,
    /// Interface used by bindings without an override
    pub default_interface: String,
    /// Bindings by name
    #[serde(default)]
    pub bindings: BTreeMap<String, SocketBindingElement>,
}

impl SocketBindingGroupElement {
    /// Create empty group
    #[must_use]
    pub fn new(name: impl Into<String>, default_interface: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_interface: default_interface.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Add binding, replacing one with the same name
    #[must_use]
    pub fn with_binding(mut self, binding: SocketBindingElement) -> Self {
        self.bindings.insert(binding.name.clone(), binding);
        self
    }

    /// Get binding
    #[inline]
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&SocketBindingElement> {
        self.bindings.get(name)
    }

    /// Interface a binding resolves to
    #[must_use]
    pub fn effective_interface(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(|binding| {
            binding
                .interface
                .as_deref()
                .unwrap_or(&self.default_interface)
        })
    }
}

/// Server declared by a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerElement {
    /// Server name
    pub name: String,
    /// Socket binding group the server uses
    pub socket_binding_group: String,
    /// Whether the host starts the server
    #[serde(default = "default_start")]
    pub start: bool,
}

fn default_start() -> bool {
    true
}

impl ServerElement {
    /// Create auto-started server
    #[must_use]
    pub fn new(name: impl Into<String>, socket_binding_group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            socket_binding_group: socket_binding_group.into(),
            start: true,
        }
    }

    /// Set whether the host starts the server
    #[must_use]
    pub fn with_start(mut self, start: bool) -> Self {
        self.start = start;
        self
    }
}

/// Host-level model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostModel {
    /// Host name
    pub name: String,
    /// Servers by name
    #[serde(default)]
    pub servers: BTreeMap<String, ServerElement>,
    /// Socket binding groups by name
    #[serde(default)]
    pub socket_binding_groups: BTreeMap<String, SocketBindingGroupElement>,
}

impl HostModel {
    /// Create empty host model
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            servers: BTreeMap::new(),
            socket_binding_groups: BTreeMap::new(),
        }
    }

    /// Add server
    #[must_use]
    pub fn with_server(mut self, server: ServerElement) -> Self {
        self.servers.insert(server.name.clone(), server);
        self
    }

    /// Add socket binding group
    #[must_use]
    pub fn with_socket_binding_group(mut self, group: SocketBindingGroupElement) -> Self {
        self.socket_binding_groups.insert(group.name.clone(), group);
        self
    }

    /// Names of servers using `group`, sorted
    #[must_use]
    pub fn servers_using_group(&self, group: &str) -> Vec<String> {
        self.servers
            .values()
            .filter(|server| server.socket_binding_group == group)
            .map(|server| server.name.clone())
            .collect()
    }

    /// Server model a server of this host runs with
    #[must_use]
    pub fn server_model(&self, server: &str) -> Option<ServerModel> {
        let server = self.servers.get(server)?;
        let group = self.socket_binding_groups.get(&server.socket_binding_group)?;
        Some(ServerModel::new(server.name.clone(), group.clone()))
    }
}

/// Server-level model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerModel {
    /// Server name
    pub name: String,
    /// Socket bindings the server runs with
    pub socket_bindings: SocketBindingGroupElement,
}

impl ServerModel {
    /// Create server model
    #[must_use]
    pub fn new(name: impl Into<String>, socket_bindings: SocketBindingGroupElement) -> Self {
        Self {
            name: name.into(),
            socket_bindings,
        }
    }
}
