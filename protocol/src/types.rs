use serde::{Deserialize, Serialize};

/// Sentinel `toStation` value marking a broadcast to every connected peer.
pub const BROADCAST_STATION: &str = "ALL";

/// The closed set of bridge message payload types.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    /// A human-authored message relayed between nodes.
    UserMessage,
    /// A command directed at a specific node or station.
    Command,
    /// A system-level notification.
    System,
    /// A keep-alive heartbeat.
    Heartbeat,
    /// A node discovery announcement.
    NodeDiscovery,
    /// Station metadata and capability advertisement.
    StationInfo,
    /// Acknowledges receipt of a prior message.
    Ack,
    /// Negative-acknowledges a prior message.
    Nack,
    /// Reports an error condition.
    Error,
    /// Reports the sender's outbound queue state.
    QueueStatus,
    /// Confirms final delivery of a prior message.
    DeliveryReceipt,
    /// Carries a registry sync payload between stations.
    NodeRegistrySync,
}

/// Delivery priority, ordered lowest to highest. Encoded on the wire as its
/// numeric value (0 LOW, 1 NORMAL, 2 HIGH, 3 URGENT).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    /// Background traffic.
    Low = 0,
    /// Default priority.
    #[default]
    Normal = 1,
    /// Time-sensitive traffic.
    High = 2,
    /// Requires immediate delivery.
    Urgent = 3,
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = crate::error::ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::Normal),
            2 => Ok(Priority::High),
            3 => Ok(Priority::Urgent),
            other => Err(crate::error::ProtocolError::InvalidFormat(format!(
                "unknown priority value {other}"
            ))),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8((*self).into())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Priority::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// The closed set of error codes carried in `error`-typed payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No such mesh node is known to the destination station.
    NodeNotFound,
    /// The destination station is not currently reachable.
    StationOffline,
    /// The message's TTL elapsed before it could be delivered.
    MessageExpired,
    /// The message failed envelope validation.
    InvalidFormat,
    /// A cryptographic seal or open operation failed.
    EncryptionError,
    /// The sender exceeded a rate limit.
    RateLimited,
    /// The destination's outbound queue is full.
    QueueFull,
    /// The destination station id is not recognized.
    UnknownStation,
    /// The envelope's protocol version is incompatible.
    ProtocolVersionMismatch,
}
