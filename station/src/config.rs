use std::path::Path;

use displaydoc::Display;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bth_common::{time::now_ms, StationId};
use bth_crypto::DEFAULT_KEY_SIZE;

/// Errors raised while loading or persisting the station configuration file.
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    /// failed to read or write {0}: {1}
    Io(String, std::io::Error),
    /// malformed configuration file: {0}
    Parse(#[from] toml::de::Error),
    /// failed to serialize configuration: {0}
    Serialize(#[from] toml::ser::Error),
    /// invalid station id: {0}
    InvalidStationId(#[from] bth_common::CommonError),
    /// failed to generate or decode an RSA key pair: {0}
    Key(String),
    /// {0} does not exist and no station id was given to create it
    MissingStationId(String),
}

/// This station's identity: its id and the metadata it advertises in
/// STATION_INFO payloads.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySection {
    pub station_id: StationId,
    pub display_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// The station's RSA key pair, persisted PKCS#1 PEM/hex.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysSection {
    pub private_key_pem: String,
    pub public_key_hex: String,
    pub key_size: usize,
}

/// Mirrors the `DISCOVERY_*` environment variables.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoverySection {
    pub url: String,
    pub timeout_secs: u64,
    pub check_interval_secs: u64,
    pub local_testing: bool,
    /// Pre-shared secret used to seal/open contact envelopes with peers on
    /// the same directory. Distributing this secret out of band is an
    /// external deployment concern, like the directory service itself.
    pub shared_key: String,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            url: "https://directory.example.invalid".to_string(),
            timeout_secs: 30,
            check_interval_secs: 300,
            local_testing: false,
            shared_key: "change-me".to_string(),
        }
    }
}

/// Mirrors the `P2P_*` environment variables.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct P2pSection {
    pub listen_port: u16,
    pub max_connections: usize,
    pub connection_timeout_secs: u64,
}

impl Default for P2pSection {
    fn default() -> Self {
        Self {
            listen_port: 8447,
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

/// Mirrors the `MESH_*` environment variables. The serial driver itself is
/// an external collaborator; these knobs are carried for when one is wired
/// in.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeshSection {
    pub auto_detect: bool,
    pub baud_rate: u32,
}

impl Default for MeshSection {
    fn default() -> Self {
        Self {
            auto_detect: true,
            baud_rate: 115_200,
        }
    }
}

/// Bookkeeping metadata stamped onto the configuration file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSection {
    pub created_at: i64,
    pub updated_at: i64,
    pub version: u32,
}

/// The full persisted station configuration: identity, keys, and the three
/// environment-overridable sections, plus metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationConfig {
    pub identity: IdentitySection,
    pub keys: KeysSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub p2p: P2pSection,
    #[serde(default)]
    pub mesh: MeshSection,
    pub metadata: MetadataSection,
}

impl StationConfig {
    /// Loads the config at `path` if it exists. `station_id`/`display_name`
    /// are only consulted to generate (and persist) a fresh configuration,
    /// new RSA key pair included, when it does not.
    pub fn load_or_init(
        path: &Path,
        station_id: Option<StationId>,
        display_name: String,
    ) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
            toml::from_str(&raw)?
        } else {
            let station_id = station_id
                .ok_or_else(|| ConfigError::MissingStationId(path.display().to_string()))?;
            let generated = Self::generate(station_id, display_name)?;
            generated.save(path)?;
            generated
        };
        config.apply_env_overlay();
        Ok(config)
    }

    fn generate(station_id: StationId, display_name: String) -> Result<Self, ConfigError> {
        let key_size = std::env::var("DEFAULT_KEY_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_KEY_SIZE);
        let private_key = RsaPrivateKey::new(&mut rand_core::OsRng, key_size)
            .map_err(|e| ConfigError::Key(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_key_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| ConfigError::Key(e.to_string()))?
            .to_string();
        let public_key_der = public_key
            .to_pkcs1_der()
            .map_err(|e| ConfigError::Key(e.to_string()))?;
        let public_key_hex = hex::encode(public_key_der.as_bytes());

        let now = now_ms();
        Ok(Self {
            identity: IdentitySection {
                station_id,
                display_name,
                location: None,
                operator: None,
                capabilities: vec!["relay".to_string()],
            },
            keys: KeysSection {
                private_key_pem,
                public_key_hex,
                key_size,
            },
            discovery: DiscoverySection::default(),
            p2p: P2pSection::default(),
            mesh: MeshSection::default(),
            metadata: MetadataSection {
                created_at: now,
                updated_at: now,
                version: 1,
            },
        })
    }

    /// Persists this configuration to `path` as TOML, bumping `updatedAt`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut to_write = self.clone();
        to_write.metadata.updated_at = now_ms();
        let raw = toml::to_string_pretty(&to_write)?;
        std::fs::write(path, raw).map_err(|e| ConfigError::Io(path.display().to_string(), e))
    }

    /// Overlays recognised environment variables onto the loaded
    /// configuration, per the `DISCOVERY_*`/`P2P_*`/`MESH_*`/`LOCAL_TESTING`
    /// table.
    fn apply_env_overlay(&mut self) {
        if let Ok(v) = std::env::var("DISCOVERY_URL") {
            self.discovery.url = v;
        }
        overlay_parsed("DISCOVERY_TIMEOUT", &mut self.discovery.timeout_secs);
        overlay_parsed("DISCOVERY_CHECK_INTERVAL", &mut self.discovery.check_interval_secs);
        overlay_parsed("P2P_LISTEN_PORT", &mut self.p2p.listen_port);
        overlay_parsed("P2P_MAX_CONNECTIONS", &mut self.p2p.max_connections);
        overlay_parsed("P2P_CONNECTION_TIMEOUT", &mut self.p2p.connection_timeout_secs);
        overlay_bool("MESH_AUTO_DETECT", &mut self.mesh.auto_detect);
        overlay_parsed("MESH_BAUD_RATE", &mut self.mesh.baud_rate);
        overlay_bool("LOCAL_TESTING", &mut self.discovery.local_testing);
    }

    /// Decodes the persisted RSA key pair.
    pub fn key_pair(&self) -> Result<bth_crypto::StationKeyPair, ConfigError> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(&self.keys.private_key_pem)
            .map_err(|e| ConfigError::Key(e.to_string()))?;
        Ok(bth_crypto::StationKeyPair::new(private_key))
    }
}

fn overlay_parsed<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

fn overlay_bool(key: &str, field: &mut bool) {
    if let Ok(v) = std::env::var(key) {
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => *field = true,
            "0" | "false" | "no" => *field = false,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_reload_round_trips_keys() {
        let station_id = StationId::new("test-station").unwrap();
        let generated = StationConfig::generate(station_id.clone(), "Test".to_string()).unwrap();
        let serialized = toml::to_string_pretty(&generated).unwrap();
        let reloaded: StationConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(reloaded.identity.station_id, station_id);
        assert_eq!(reloaded.keys.private_key_pem, generated.keys.private_key_pem);
        reloaded.key_pair().unwrap();
    }

    #[test]
    fn defaults_match_environment_table() {
        let config = DiscoverySection::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.check_interval_secs, 300);
        assert!(!config.local_testing);

        let p2p = P2pSection::default();
        assert_eq!(p2p.listen_port, 8447);
        assert_eq!(p2p.max_connections, 10);
        assert_eq!(p2p.connection_timeout_secs, 30);

        let mesh = MeshSection::default();
        assert!(mesh.auto_detect);
        assert_eq!(mesh.baud_rate, 115_200);
    }
}
