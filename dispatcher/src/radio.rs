use std::future::Future;
use std::pin::Pin;

use bth_common::NodeId;

/// A node visible on the locally attached mesh radio. Owned by the radio
/// driver, which is out of scope for this crate — only its shape is needed
/// here to resolve relay targets and render confirmations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalNode {
    /// The node's numeric identifier.
    pub node_id: NodeId,
    /// The node's full display name.
    pub long_name: String,
    /// The node's short display name, used in confirmations.
    pub short_name: String,
}

/// The narrow contract the dispatcher needs from the mesh radio: the
/// current node table, and the ability to send text to a node. The serial
/// driver and device auto-detection behind this trait are out of scope.
pub trait LocalRadio: Send + Sync {
    /// The locally visible node table.
    fn nodes(&self) -> Vec<LocalNode>;

    /// Sends `text` to `node_id` over the local radio.
    fn send<'a>(
        &'a self,
        node_id: NodeId,
        text: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
}

/// Looks up `target` in `nodes` by exact numeric id, or by case-insensitive
/// substring match against long/short names (first match wins).
pub fn resolve_local(nodes: &[LocalNode], target: &str) -> Option<LocalNode> {
    if let Ok(node_id) = target.parse::<u32>() {
        if let Some(found) = nodes.iter().find(|n| n.node_id.0 == node_id) {
            return Some(found.clone());
        }
    }
    let needle = target.to_ascii_lowercase();
    nodes
        .iter()
        .find(|n| {
            n.long_name.to_ascii_lowercase().contains(&needle)
                || n.short_name.to_ascii_lowercase().contains(&needle)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Vec<LocalNode> {
        vec![
            LocalNode {
                node_id: NodeId(456),
                long_name: "Alice Base".into(),
                short_name: "Alice".into(),
            },
            LocalNode {
                node_id: NodeId(789),
                long_name: "Bob Mobile".into(),
                short_name: "Bob".into(),
            },
        ]
    }

    #[test]
    fn numeric_target_matches_by_id() {
        let found = resolve_local(&nodes(), "789").unwrap();
        assert_eq!(found.node_id, NodeId(789));
    }

    #[test]
    fn substring_matches_case_insensitively() {
        let found = resolve_local(&nodes(), "bob").unwrap();
        assert_eq!(found.node_id, NodeId(789));
    }

    #[test]
    fn unknown_target_resolves_to_none() {
        assert!(resolve_local(&nodes(), "carol").is_none());
    }
}
