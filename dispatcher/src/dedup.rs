use std::collections::{HashSet, VecDeque};

use bth_common::{NodeId, StationId};

type Key = (StationId, NodeId, NodeId, String);

/// A bounded, most-recent-100 dedup window keyed by
/// `(fromStation, fromNode, toNode, text)`. FIFO eviction on overflow.
pub struct DedupWindow {
    capacity: usize,
    order: VecDeque<Key>,
    seen: HashSet<Key>,
}

impl DedupWindow {
    /// Builds a window retaining the most recent `capacity` tuples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Records `key` if not already seen, evicting the oldest entry when
    /// over capacity. Returns `true` if this is the first sighting (the
    /// packet should be processed), `false` if it's a duplicate.
    pub fn observe(
        &mut self,
        from_station: StationId,
        from_node: NodeId,
        to_node: NodeId,
        text: String,
    ) -> bool {
        let key = (from_station, from_node, to_node, text);
        if self.seen.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.seen.insert(key);
        true
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str) -> StationId {
        StationId::new(name).unwrap()
    }

    #[test]
    fn first_sighting_is_observed() {
        let mut window = DedupWindow::new(100);
        assert!(window.observe(station("a"), NodeId(1), NodeId(2), "hi".into()));
    }

    #[test]
    fn repeat_within_window_is_deduplicated() {
        let mut window = DedupWindow::new(100);
        assert!(window.observe(station("a"), NodeId(1), NodeId(2), "hi".into()));
        assert!(!window.observe(station("a"), NodeId(1), NodeId(2), "hi".into()));
    }

    #[test]
    fn eviction_allows_reobservation_after_overflow() {
        let mut window = DedupWindow::new(2);
        window.observe(station("a"), NodeId(1), NodeId(1), "one".into());
        window.observe(station("a"), NodeId(2), NodeId(2), "two".into());
        window.observe(station("a"), NodeId(3), NodeId(3), "three".into());
        assert!(window.observe(station("a"), NodeId(1), NodeId(1), "one".into()));
    }
}
