use displaydoc::Display;
use thiserror::Error;

/// Errors produced by sealing, opening, deriving, or signing operations.
#[derive(Debug, Display, Error)]
pub enum CryptoError {
    /// failed to seal payload: {0}
    Seal(String),
    /// failed to open payload: {0}
    Open(String),
    /// key derivation failed: {0}
    KeyDerive(String),
    /// hmac verification failed
    HmacVerify,
    /// malformed encoding in envelope field `{0}`
    MalformedEncoding(&'static str),
    /// rsa key error: {0}
    Rsa(String),
}

/// Convenience alias for results returned by this crate.
pub type CryptoResult<T> = Result<T, CryptoError>;
