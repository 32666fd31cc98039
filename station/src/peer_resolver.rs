use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use bth_common::StationId;
use bth_discovery::{open_contact_info, ContactInfo};
use bth_transport::PeerInfoResolver;

/// Resolves peer stations to dialable addresses from directory contact
/// envelopes. Populated by the caller as discovery events arrive; kept
/// separate from the discovery client's event loop so the same event
/// stream can also drive the dispatcher's peer-discovered/lost hooks.
pub struct PeerCache {
    shared_key: String,
    contacts: RwLock<HashMap<StationId, ContactInfo>>,
}

impl PeerCache {
    /// Builds an empty cache, sealed/opened under `shared_key`.
    pub fn new(shared_key: String) -> Arc<Self> {
        Arc::new(Self {
            shared_key,
            contacts: RwLock::new(HashMap::new()),
        })
    }

    /// Opens and stores a newly discovered peer's contact envelope.
    pub async fn insert(&self, station_id: StationId, encrypted_contact_info: &str) {
        match open_contact_info(encrypted_contact_info, &self.shared_key) {
            Ok(contact) => {
                self.contacts.write().await.insert(station_id, contact);
            }
            Err(err) => {
                warn!(%station_id, %err, "failed to open peer contact envelope");
            }
        }
    }

    /// Drops a peer that is no longer active.
    pub async fn remove(&self, station_id: &StationId) {
        self.contacts.write().await.remove(station_id);
    }
}

impl PeerInfoResolver for PeerCache {
    fn resolve<'a>(
        &'a self,
        station_id: &'a StationId,
    ) -> Pin<Box<dyn Future<Output = Option<(String, u16)>> + Send + 'a>> {
        Box::pin(async move {
            self.contacts
                .read()
                .await
                .get(station_id)
                .map(|contact| (contact.ip.clone(), contact.port))
        })
    }
}
