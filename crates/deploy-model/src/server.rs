//! Server-level updates

use crate::element::ServerModel;
use crate::error::UpdateFailed;
use crate::socket::ServerSocketBindingUpdate;
use crate::update::{ModelUpdate, UpdateContext, UpdateResultHandler};
use serde::{Deserialize, Serialize};

/// Update applied to a single server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "update", rename_all = "kebab-case")]
pub enum ServerModelUpdate {
    /// Change to the server's socket bindings
    SocketBinding(ServerSocketBindingUpdate),
}

impl ServerModelUpdate {
    /// Apply to a running server
    pub fn apply_runtime<P>(
        &self,
        context: &mut UpdateContext,
        handler: &mut dyn UpdateResultHandler<(), P>,
        param: P,
    ) {
        match self {
            Self::SocketBinding(update) => update.apply_runtime(context, handler, param),
        }
    }
}

impl ModelUpdate<ServerModel> for ServerModelUpdate {
    type Output = ();

    fn apply_update(&self, server: &mut ServerModel) -> Result<(), UpdateFailed> {
        match self {
            Self::SocketBinding(update) => update.apply_update(server),
        }
    }

    fn compensating_update(&self, original: &ServerModel) -> Result<Self, UpdateFailed> {
        match self {
            Self::SocketBinding(update) => update.compensating_update(original).map(Self::SocketBinding),
        }
    }

    fn server_model_update(&self) -> Option<ServerModelUpdate> {
        Some(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{SocketBindingElement, SocketBindingGroupElement};
    use crate::socket::SocketBindingUpdate;

    #[test]
    fn delegates_and_compensates() {
        let original = ServerModel::new(
            "one",
            SocketBindingGroupElement::new("standard", "public")
                .with_binding(SocketBindingElement::new("http", 8080)),
        );
        let update = ServerModelUpdate::SocketBinding(ServerSocketBindingUpdate::new(
            SocketBindingUpdate::SetPort {
                name: "http".into(),
                port: 9090,
            },
        ));
        let compensation = update.compensating_update(&original).unwrap();

        let mut model = original.clone();
        update.apply_update(&mut model).unwrap();
        assert_eq!(model.socket_bindings.binding("http").map(|b| b.port), Some(9090));
        compensation.apply_update(&mut model).unwrap();
        assert_eq!(model, original);
    }
}
