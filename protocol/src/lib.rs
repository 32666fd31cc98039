//! The bridge message envelope: construction, validation, JSON codec, TTL
//! expiry, and retry backoff, plus the typed payload bodies carried inside
//! it.
//!
//! # Modules
//!
//! - [`message`] — the envelope itself and its lifecycle helpers.
//! - [`routing`] — station/node addressing.
//! - [`delivery`] — priority, TTL, and retry policy.
//! - [`payload`] — the opaque payload wrapper and its typed bodies.
//! - [`types`] — the closed enumerations used throughout the envelope.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod delivery;
pub mod error;
pub mod message;
pub mod payload;
pub mod routing;
pub mod types;

pub use delivery::Delivery;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{retry_delay, BridgeMessage, BridgeMessageOptions, MAX_RETRY_DELAY_MS, PROTOCOL_VERSION};
pub use payload::{
    AckPayload, AckStatus, DiscoveredNode, NodeDiscoveryPayload, Payload, QueueStatus,
    RegistrySyncNode, RegistrySyncPayload, StationInfoPayload,
};
pub use routing::Routing;
pub use types::{ErrorCode, PayloadType, Priority, BROADCAST_STATION};
