//! High-level station-to-station send/broadcast/ack/discovery façade built
//! atop the P2P transport, used by the relay dispatcher.
//!
//! # Modules
//!
//! - [`client`] — the [`BridgeClient`] and its handler wiring.
//! - [`events`] — typed events re-emitted for the dispatcher.
//! - [`providers`] — callbacks answering peer discovery/info requests.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod client;
pub mod events;
pub mod providers;
mod system_request;

pub use client::BridgeClient;
pub use events::BridgeClientEvent;
pub use providers::BridgeClientProviders;
