use std::future::Future;
use std::pin::Pin;

use tracing::info;

use bth_common::NodeId;
use bth_dispatcher::{LocalNode, LocalRadio};

/// A [`LocalRadio`] backed by a fixed node table read from configuration,
/// standing in for the serial mesh driver, which is an external
/// collaborator this workspace does not own. `send` logs what would be
/// transmitted rather than writing to a serial port.
pub struct ConfiguredRadio {
    nodes: Vec<LocalNode>,
}

impl ConfiguredRadio {
    /// Builds a radio over a static node table.
    pub fn new(nodes: Vec<LocalNode>) -> Self {
        Self { nodes }
    }
}

impl LocalRadio for ConfiguredRadio {
    fn nodes(&self) -> Vec<LocalNode> {
        self.nodes.clone()
    }

    fn send<'a>(
        &'a self,
        node_id: NodeId,
        text: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>> {
        Box::pin(async move {
            info!(%node_id, %text, "would transmit over the local mesh radio");
            Ok(())
        })
    }
}
