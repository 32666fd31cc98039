use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use bth_bridge_protocol::{BridgeMessage, PayloadType};

type Handler = Arc<dyn Fn(BridgeMessage) + Send + Sync>;

/// A closed-set, per-payload-type handler registry. Missing handlers are
/// logged, not treated as an error.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<PayloadType, Handler>>,
}

impl HandlerRegistry {
    /// Installs (or replaces) the handler for `payload_type`.
    pub async fn on(&self, payload_type: PayloadType, handler: Handler) {
        self.handlers.write().await.insert(payload_type, handler);
    }

    /// Dispatches `message` to the handler registered for its payload type.
    pub async fn dispatch(&self, message: BridgeMessage) {
        let payload_type = message.payload.payload_type;
        let handler = self.handlers.read().await.get(&payload_type).cloned();
        match handler {
            Some(handler) => handler(message),
            None => warn!(?payload_type, "no handler registered for payload type"),
        }
    }
}
