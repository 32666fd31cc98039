use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Computes an HMAC-SHA256 tag over `message` using `key`, hex-encoded.
pub fn sign(key: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex-encoded HMAC-SHA256 `tag` over `message` using `key`.
pub fn verify(key: &[u8], message: &[u8], tag_hex: &str) -> CryptoResult<()> {
    let tag = hex::decode(tag_hex).map_err(|_| CryptoError::MalformedEncoding("tag"))?;
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.verify_slice(&tag).map_err(|_| CryptoError::HmacVerify)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_succeeds() {
        let tag = sign(b"key", b"message");
        assert!(verify(b"key", b"message", &tag).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let tag = sign(b"key", b"message");
        assert!(verify(b"key", b"different message", &tag).is_err());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let tag = sign(b"key", b"message");
        assert!(verify(b"other-key", b"message", &tag).is_err());
    }
}
