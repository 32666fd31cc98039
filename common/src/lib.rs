//! Shared identifiers and time helpers used across the station bridge
//! federation crates.
//!
//! # Modules
//!
//! - [`station_id`] — the validated station identifier newtype.
//! - [`node_id`] — the mesh node numeric identifier newtype.
//! - [`time`] — millisecond-since-epoch helpers shared by every wire type.
//! - [`error`] — small error helpers re-used by the component crates.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod error;
pub mod node_id;
pub mod station_id;
pub mod time;

pub use error::CommonError;
pub use node_id::NodeId;
pub use station_id::StationId;
pub use time::now_ms;
