//! Directory client: station registration, heartbeat, peer-list polling and
//! diffing, public IP acquisition, and contact envelope sealing.
//!
//! # Modules
//!
//! - [`client`] — the [`DiscoveryClient`] and its background poll loop.
//! - [`directory`] — directory wire types and contact envelope helpers.
//! - [`events`] — the typed peer appearance/disappearance events.
//! - [`public_ip`] — public IP address acquisition.
//! - [`config`] — directory client configuration.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod public_ip;

pub use client::DiscoveryClient;
pub use config::{DiscoveryConfig, DiscoveryConfigBuilder};
pub use directory::{
    open_contact_info, seal_contact_info, ContactInfo, DirectoryResponse, HealthData, PeerRecord,
    PeersData, RegisterRequest,
};
pub use error::{NetworkError, NetworkResult};
pub use events::DiscoveryEvent;
