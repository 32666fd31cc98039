use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

/// Default PBKDF2 iteration count used when a caller does not override it.
///
/// Matches the discovery-key derivation requirement of at least 100,000
/// rounds.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

const KEY_LEN: usize = 32;

/// Derives a 256-bit key from `passphrase` and `salt` using PBKDF2-HMAC-SHA256.
pub fn derive_key(passphrase: &[u8], salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut key);
    key
}
