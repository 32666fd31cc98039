use serde::{Deserialize, Serialize};

use bth_common::StationId;
use bth_crypto::{open_contact_envelope, seal_contact_envelope, ContactEnvelope};

use crate::error::{NetworkError, NetworkResult};

/// The envelope the directory stores per station: `{ip, port, publicKey,
/// lastSeen}`, sealed under the network's discovery key before it is sent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    /// The station's reachable IP address.
    pub ip: String,
    /// The station's P2P listen port.
    pub port: u16,
    /// Hex-encoded RSA public key.
    pub public_key: String,
    /// When this contact info was last refreshed, ms since epoch.
    pub last_seen: i64,
}

/// Seals `contact` as a JSON-encoded [`ContactEnvelope`] string, suitable for
/// the directory's `encrypted_contact_info` field.
pub fn seal_contact_info(contact: &ContactInfo, discovery_key_hex: &str) -> NetworkResult<String> {
    let plaintext = serde_json::to_vec(contact)
        .map_err(|e| NetworkError::ContactDecrypt(e.to_string()))?;
    let envelope = seal_contact_envelope(&plaintext, discovery_key_hex)
        .map_err(|e| NetworkError::ContactDecrypt(e.to_string()))?;
    serde_json::to_string(&envelope).map_err(|e| NetworkError::ContactDecrypt(e.to_string()))
}

/// Opens a sealed contact envelope string previously produced by
/// [`seal_contact_info`].
pub fn open_contact_info(encrypted: &str, discovery_key_hex: &str) -> NetworkResult<ContactInfo> {
    let envelope: ContactEnvelope = serde_json::from_str(encrypted)
        .map_err(|e| NetworkError::ContactDecrypt(e.to_string()))?;
    let plaintext = open_contact_envelope(&envelope, discovery_key_hex)
        .map_err(|e| NetworkError::ContactDecrypt(e.to_string()))?;
    serde_json::from_slice(&plaintext).map_err(|e| NetworkError::ContactDecrypt(e.to_string()))
}

/// The generic response envelope every directory endpoint returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoryResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// The payload, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// An error message, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server timestamp, ms since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// The body of a station registration/heartbeat request.
#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    /// The registering station's identifier.
    pub station_id: StationId,
    /// The sealed contact envelope.
    pub encrypted_contact_info: String,
    /// Hex-encoded RSA public key.
    pub public_key: String,
}

/// A single entry in the directory's active peer list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerRecord {
    /// The peer's station identifier.
    pub station_id: StationId,
    /// The peer's sealed contact envelope.
    pub encrypted_contact_info: String,
    /// The peer's hex-encoded RSA public key.
    pub public_key: String,
}

/// The `data` payload of a `?peers=true` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeersData {
    /// The currently active peers known to the directory.
    pub peers: Vec<PeerRecord>,
}

/// The `data` payload of a `?health=true` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthData {
    /// Directory service health status string.
    pub status: String,
    /// Number of currently active stations.
    pub active_stations: u32,
    /// Directory service version.
    pub version: String,
    /// Server timestamp, ms since epoch.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_info_round_trip() {
        let contact = ContactInfo {
            ip: "203.0.113.7".into(),
            port: 8447,
            public_key: "deadbeef".into(),
            last_seen: 1_700_000_000_000,
        };
        let sealed = seal_contact_info(&contact, "shared-discovery-key").unwrap();
        let opened = open_contact_info(&sealed, "shared-discovery-key").unwrap();
        assert_eq!(opened, contact);
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let contact = ContactInfo {
            ip: "203.0.113.7".into(),
            port: 8447,
            public_key: "deadbeef".into(),
            last_seen: 1_700_000_000_000,
        };
        let sealed = seal_contact_info(&contact, "shared-discovery-key").unwrap();
        assert!(open_contact_info(&sealed, "other-key").is_err());
    }
}
