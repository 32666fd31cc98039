use rsa::{RsaPrivateKey, RsaPublicKey};

/// The default RSA modulus size used when a key pair is generated in-process
/// (e.g. for tests). Station key generation in production is handled by an
/// external provisioning step; this crate only consumes the resulting keys.
pub const DEFAULT_KEY_SIZE: usize = 2048;

/// An RSA key pair held for hybrid sealing.
///
/// `RsaPrivateKey` zeroizes its own backing integers on drop, so no
/// additional cleanup is needed here.
pub struct StationKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl StationKeyPair {
    /// Wraps an externally-provisioned key pair.
    pub fn new(private_key: RsaPrivateKey) -> Self {
        let public_key = RsaPublicKey::from(&private_key);
        Self {
            private_key,
            public_key,
        }
    }

    /// The public key, safe to hand to peers for sealing.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// The private key, used to open hybrid envelopes addressed to this
    /// station.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }
}
