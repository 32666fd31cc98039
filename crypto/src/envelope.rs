use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, DEFAULT_ITERATIONS};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// A passphrase-sealed contact envelope: salt and nonce are random per seal,
/// so the same plaintext never produces the same ciphertext twice.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactEnvelope {
    /// Hex-encoded PBKDF2 salt.
    pub salt: String,
    /// Hex-encoded AES-GCM nonce.
    pub nonce: String,
    /// Hex-encoded ciphertext, including the AEAD authentication tag.
    pub ciphertext: String,
    /// PBKDF2 iteration count used to derive the sealing key.
    pub iterations: u32,
}

/// Seals `plaintext` under a key derived from `passphrase`.
pub fn seal_contact_envelope(plaintext: &[u8], passphrase: &str) -> CryptoResult<ContactEnvelope> {
    seal_contact_envelope_with_iterations(plaintext, passphrase, DEFAULT_ITERATIONS)
}

/// Same as [`seal_contact_envelope`] but with an explicit iteration count.
pub fn seal_contact_envelope_with_iterations(
    plaintext: &[u8],
    passphrase: &str,
    iterations: u32,
) -> CryptoResult<ContactEnvelope> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key_bytes = derive_key(passphrase.as_bytes(), &salt, iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Seal(e.to_string()))?;

    Ok(ContactEnvelope {
        salt: hex::encode(salt),
        nonce: hex::encode(nonce_bytes),
        ciphertext: hex::encode(ciphertext),
        iterations,
    })
}

/// Opens a [`ContactEnvelope`] sealed with a matching `passphrase`.
pub fn open_contact_envelope(
    envelope: &ContactEnvelope,
    passphrase: &str,
) -> CryptoResult<Vec<u8>> {
    let salt = hex::decode(&envelope.salt).map_err(|_| CryptoError::MalformedEncoding("salt"))?;
    let nonce_bytes =
        hex::decode(&envelope.nonce).map_err(|_| CryptoError::MalformedEncoding("nonce"))?;
    let ciphertext =
        hex::decode(&envelope.ciphertext).map_err(|_| CryptoError::MalformedEncoding("ciphertext"))?;

    let key_bytes = derive_key(passphrase.as_bytes(), &salt, envelope.iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext.as_slice())
        .map_err(|e| CryptoError::Open(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let sealed = seal_contact_envelope(b"contact payload", "shared-secret").unwrap();
        let opened = open_contact_envelope(&sealed, "shared-secret").unwrap();
        assert_eq!(opened, b"contact payload");
    }

    #[test]
    fn wrong_passphrase_fails() {
        let sealed = seal_contact_envelope(b"contact payload", "shared-secret").unwrap();
        assert!(open_contact_envelope(&sealed, "wrong-secret").is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let mut sealed = seal_contact_envelope(b"contact payload", "shared-secret").unwrap();
        let mut bytes = hex::decode(&sealed.ciphertext).unwrap();
        bytes[0] ^= 0xff;
        sealed.ciphertext = hex::encode(bytes);
        assert!(open_contact_envelope(&sealed, "shared-secret").is_err());
    }

    #[test]
    fn two_seals_of_same_plaintext_differ() {
        let a = seal_contact_envelope(b"same", "secret").unwrap();
        let b = seal_contact_envelope(b"same", "secret").unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}
