//! Cross-station node registry: a durable `(node, station)` store synced
//! between stations, with conflict resolution and targeted queries for
//! nodes not known locally. Consumed by the relay dispatcher.
//!
//! # Modules
//!
//! - [`registry`] — the [`NodeRegistry`] actor: timers, conflict
//!   resolution, targeted query correlation.
//! - [`storage`] — the SQLite-backed row store.
//! - [`strategy`] — conflict resolution policies.
//! - [`events`] — outbound wire traffic and state-change notifications.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod checksum;
pub mod conflict;
pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod registry;
pub mod storage;
pub mod strategy;

pub use config::RegistryConfig;
pub use conflict::ConflictRecord;
pub use entry::NodeRegistryEntry;
pub use error::{RegistryError, RegistryResult};
pub use events::{NodeQueryMessage, NodeQueryResponse, RegistryEvent};
pub use registry::NodeRegistry;
pub use strategy::ConflictStrategy;
