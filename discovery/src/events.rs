use crate::directory::PeerRecord;

/// Events emitted as the directory client diffs successive peer-list polls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A station was seen for the first time.
    PeerDiscovered(PeerRecord),
    /// A previously known station is no longer in the active list.
    PeerLost(bth_common::StationId),
}
