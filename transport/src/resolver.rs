use std::future::Future;
use std::pin::Pin;

use bth_common::StationId;

/// Looks up how to reach a station: decrypting its directory contact
/// envelope is this trait's implementer's concern, not the transport's.
pub trait PeerInfoResolver: Send + Sync {
    /// Resolves `station_id` to a dialable `(host, port)`, if known.
    fn resolve<'a>(
        &'a self,
        station_id: &'a StationId,
    ) -> Pin<Box<dyn Future<Output = Option<(String, u16)>> + Send + 'a>>;
}
