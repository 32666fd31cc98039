use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters tracking transport activity. Safe to read from many
/// tasks; increments tolerate relaxed ordering.
#[derive(Default)]
pub struct TransportStats {
    bridge_messages_sent: AtomicU64,
    bridge_messages_received: AtomicU64,
    send_errors: AtomicU64,
    receive_errors: AtomicU64,
}

impl TransportStats {
    pub(crate) fn record_sent(&self) {
        self.bridge_messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.bridge_messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total bridge messages successfully sent.
    pub fn bridge_messages_sent(&self) -> u64 {
        self.bridge_messages_sent.load(Ordering::Relaxed)
    }

    /// Total bridge messages successfully received and dispatched.
    pub fn bridge_messages_received(&self) -> u64 {
        self.bridge_messages_received.load(Ordering::Relaxed)
    }

    /// Total physical send attempts that ultimately failed.
    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    /// Total inbound frames that failed envelope validation.
    pub fn receive_errors(&self) -> u64 {
        self.receive_errors.load(Ordering::Relaxed)
    }
}
