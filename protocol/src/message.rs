use serde::{Deserialize, Serialize};

use bth_common::{time::now_ms, NodeId, StationId};
use bth_crypto::generate_message_id;

use crate::delivery::Delivery;
use crate::error::{ProtocolError, ProtocolResult};
use crate::payload::Payload;
use crate::routing::Routing;
use crate::types::{Priority, PayloadType};

/// The protocol version this crate produces and accepts.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// The cap applied to exponential retry backoff, in milliseconds.
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// The base delay used by [`retry_delay`] before doubling.
pub const DEFAULT_RETRY_BASE_MS: u64 = 1_000;

/// A fully-addressed, TTL-bounded bridge message envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// The protocol version this envelope was produced under.
    pub version: String,
    /// A unique id for this message, scoped to the sender's lifetime.
    pub message_id: String,
    /// When this envelope was created, ms since epoch.
    pub timestamp: i64,
    /// Station/node addressing.
    pub routing: Routing,
    /// The message body.
    pub payload: Payload,
    /// Delivery policy.
    pub delivery: Delivery,
}

/// Optional overrides accepted by [`BridgeMessage::new`].
#[derive(Clone, Debug, Default)]
pub struct BridgeMessageOptions {
    /// Overrides the default [`Priority::Normal`].
    pub priority: Option<Priority>,
    /// Overrides the default 3600s TTL.
    pub ttl: Option<u32>,
    /// Overrides the default `requiresAck = true`.
    pub requires_ack: Option<bool>,
    /// Overrides the default `maxRetries = 3`.
    pub max_retries: Option<u32>,
}

impl BridgeMessage {
    /// Builds a fully populated envelope, applying the defaults from
    /// [`Delivery::default`] unless `opts` overrides them.
    pub fn new(
        from_station: StationId,
        to_station: StationId,
        from_node: NodeId,
        to_node: NodeId,
        payload_type: PayloadType,
        data: String,
        opts: BridgeMessageOptions,
    ) -> Self {
        let mut delivery = Delivery::default();
        if let Some(priority) = opts.priority {
            delivery.priority = priority;
        }
        if let Some(ttl) = opts.ttl {
            delivery.ttl = ttl;
        }
        if let Some(requires_ack) = opts.requires_ack {
            delivery.requires_ack = requires_ack;
        }
        if let Some(max_retries) = opts.max_retries {
            delivery.max_retries = max_retries;
        }

        let timestamp = now_ms();
        Self {
            version: PROTOCOL_VERSION.to_string(),
            message_id: generate_message_id(),
            timestamp,
            routing: Routing {
                from_station,
                to_station,
                from_node,
                to_node,
                hops: Vec::new(),
            },
            payload: Payload {
                payload_type,
                data,
                encrypted: false,
            },
            delivery,
        }
    }

    /// Validates structural invariants beyond what the type system already
    /// enforces: the hop list must not repeat the origin station, and the
    /// protocol version must be one this codec understands.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch(self.version.clone()));
        }
        if self.routing.has_duplicate_origin_hop() {
            return Err(ProtocolError::InvalidFormat(
                "hop list contains the origin station more than once".into(),
            ));
        }
        if self.delivery.retry_count > self.delivery.max_retries {
            return Err(ProtocolError::InvalidFormat(format!(
                "retryCount {} exceeds maxRetries {}",
                self.delivery.retry_count, self.delivery.max_retries
            )));
        }
        Ok(())
    }

    /// Whether this envelope's TTL has elapsed relative to `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.timestamp + i64::from(self.delivery.ttl) * 1000
    }

    /// Whether this envelope's TTL has elapsed relative to the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }

    /// Serializes this envelope as JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes an envelope from JSON and validates it.
    pub fn from_json(data: &str) -> ProtocolResult<Self> {
        let message: Self = serde_json::from_str(data)
            .map_err(|e| ProtocolError::InvalidFormat(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }
}

/// Exponential backoff delay for the `n`-th retry, capped at
/// [`MAX_RETRY_DELAY_MS`].
pub fn retry_delay(n: u32, base_ms: u64) -> u64 {
    let scaled = base_ms.saturating_mul(1u64 << n.min(32));
    scaled.min(MAX_RETRY_DELAY_MS)
}
