use serde::{Deserialize, Serialize};

use bth_common::NodeId;

use crate::entry::NodeRegistryEntry;
use crate::strategy::ConflictStrategy;

/// An audit-trail row recording a resolved conflict between two stations'
/// view of the same node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// The node both conflicting rows describe.
    pub node_id: NodeId,
    /// The rows that disagreed, in the order they were compared.
    pub conflicting_entries: Vec<NodeRegistryEntry>,
    /// The row that was kept.
    pub resolved_entry: NodeRegistryEntry,
    /// The strategy used to pick `resolved_entry`.
    pub strategy: ConflictStrategy,
    /// When the conflict was resolved, ms since epoch.
    pub timestamp: i64,
}
