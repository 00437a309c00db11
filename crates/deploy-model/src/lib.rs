//! Deployment Model
//!
//! Reversible updates to the host and server configuration model.
//!
//! # Core Concepts
//!
//! - [`ModelUpdate`]: Command that edits a model element and can produce its inverse
//! - [`SocketBindingUpdate`]: Edit to a socket binding group
//! - [`ServerModelUpdate`]: Server-level projection of a host update
//! - [`HostModelUpdate`]: Edit to the host model, reporting the servers it affects
//! - [`UpdateContext`]: Runtime socket state a server-level update can act on
//!
//! # Example
//!
//! ```rust,ignore
//! use deploy_model::{HostModelUpdate, ModelUpdate, SocketBindingUpdate};
//!
//! let update = HostModelUpdate::SocketBindingGroup {
//!     group: "standard-sockets".into(),
//!     update: SocketBindingUpdate::SetPort { name: "http".into(), port: 8180 },
//! };
//! let undo = update.compensating_update(&host)?;
//! let servers = update.affected_servers(&host);
//! update.apply_update(&mut host)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod element;
mod error;
mod host;
mod server;
mod socket;
mod update;

// Re-exports
pub use element::{
    HostModel, ServerElement, ServerModel, SocketBindingElement, SocketBindingGroupElement,
};
pub use error::UpdateFailed;
pub use host::HostModelUpdate;
pub use server::ServerModelUpdate;
pub use socket::{ServerSocketBindingUpdate, SocketBindingUpdate};
pub use update::{BoundSocket, ModelUpdate, UpdateContext, UpdateResultHandler, UpdateResults};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
