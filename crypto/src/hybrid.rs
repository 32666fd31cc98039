use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use rand_core::{OsRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// A hybrid-sealed message: a random AES-256 key wrapped with RSA-OAEP, and
/// the payload sealed under that key with AES-GCM. Wire-compatible field
/// names and base64 encoding, per the bridge message envelope.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HybridEnvelope {
    /// Base64-encoded RSA-OAEP-wrapped AES key.
    pub encrypted_key: String,
    /// Base64-encoded AES-GCM nonce.
    pub iv: String,
    /// Base64-encoded AEAD authentication tag.
    pub auth_tag: String,
    /// Base64-encoded ciphertext, tag excluded.
    pub encrypted_message: String,
}

/// Seals `plaintext` for `recipient_public_key`: a fresh AES key is
/// generated, used to encrypt the payload, then wrapped with RSA-OAEP so
/// only the holder of the matching private key can recover it.
pub fn seal_hybrid(
    plaintext: &[u8],
    recipient_public_key: &RsaPublicKey,
) -> CryptoResult<HybridEnvelope> {
    let mut message_key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut message_key);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&message_key));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let mut sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Seal(e.to_string()))?;
    let auth_tag = sealed.split_off(sealed.len() - TAG_LEN);

    let wrapped_key = recipient_public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &message_key)
        .map_err(|e| CryptoError::Rsa(e.to_string()))?;

    Ok(HybridEnvelope {
        encrypted_key: BASE64_ENGINE.encode(wrapped_key),
        iv: BASE64_ENGINE.encode(nonce_bytes),
        auth_tag: BASE64_ENGINE.encode(auth_tag),
        encrypted_message: BASE64_ENGINE.encode(sealed),
    })
}

/// Opens a [`HybridEnvelope`] with the matching `recipient_private_key`.
pub fn open_hybrid(
    envelope: &HybridEnvelope,
    recipient_private_key: &RsaPrivateKey,
) -> CryptoResult<Vec<u8>> {
    let wrapped_key = BASE64_ENGINE
        .decode(&envelope.encrypted_key)
        .map_err(|_| CryptoError::MalformedEncoding("encryptedKey"))?;
    let nonce_bytes = BASE64_ENGINE
        .decode(&envelope.iv)
        .map_err(|_| CryptoError::MalformedEncoding("iv"))?;
    let auth_tag = BASE64_ENGINE
        .decode(&envelope.auth_tag)
        .map_err(|_| CryptoError::MalformedEncoding("authTag"))?;
    let encrypted_message = BASE64_ENGINE
        .decode(&envelope.encrypted_message)
        .map_err(|_| CryptoError::MalformedEncoding("encryptedMessage"))?;

    let message_key = recipient_private_key
        .decrypt(Oaep::new::<Sha256>(), &wrapped_key)
        .map_err(|e| CryptoError::Rsa(e.to_string()))?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&message_key));
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut ciphertext = encrypted_message;
    ciphertext.extend_from_slice(&auth_tag);

    cipher
        .decrypt(nonce, ciphertext.as_slice())
        .map_err(|e| CryptoError::Open(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("key generation");
        let public_key = RsaPublicKey::from(&private_key);
        (private_key, public_key)
    }

    #[test]
    fn round_trip() {
        let (private_key, public_key) = test_keypair();
        let sealed = seal_hybrid(b"hybrid payload", &public_key).unwrap();
        let opened = open_hybrid(&sealed, &private_key).unwrap();
        assert_eq!(opened, b"hybrid payload");
    }

    #[test]
    fn wrong_private_key_fails() {
        let (_, public_key) = test_keypair();
        let (other_private_key, _) = test_keypair();
        let sealed = seal_hybrid(b"hybrid payload", &public_key).unwrap();
        assert!(open_hybrid(&sealed, &other_private_key).is_err());
    }

    #[test]
    fn serialises_to_the_wire_field_names() {
        let (_, public_key) = test_keypair();
        let sealed = seal_hybrid(b"hybrid payload", &public_key).unwrap();
        let json = serde_json::to_value(&sealed).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("encryptedKey"));
        assert!(object.contains_key("iv"));
        assert!(object.contains_key("authTag"));
        assert!(object.contains_key("encryptedMessage"));
    }
}
