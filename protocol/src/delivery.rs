use serde::{Deserialize, Serialize};

use crate::types::Priority;

/// Default time-to-live, in seconds, for a freshly constructed envelope.
pub const DEFAULT_TTL_SECS: u32 = 3600;

/// Default retry ceiling for a freshly constructed envelope.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The delivery policy block of a bridge message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Delivery priority.
    pub priority: Priority,
    /// Time-to-live in seconds, measured from `timestamp`.
    pub ttl: u32,
    /// Whether the recipient is expected to send back an ACK.
    pub requires_ack: bool,
    /// Number of delivery attempts made so far.
    pub retry_count: u32,
    /// Maximum number of delivery attempts before giving up.
    pub max_retries: u32,
}

impl Delivery {
    /// Whether `retry_count` has not yet exceeded `max_retries`.
    pub fn can_retry(&self) -> bool {
        self.retry_count <= self.max_retries
    }
}

impl Default for Delivery {
    fn default() -> Self {
        Self {
            priority: Priority::default(),
            ttl: DEFAULT_TTL_SECS,
            requires_ack: true,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
