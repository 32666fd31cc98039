/// Configuration for the P2P transport's retry policy.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Physical send attempts beyond the first, per `sendMessage` call.
    pub retry_attempts: u32,
    /// Base delay, in milliseconds, fed to the bridge protocol's retry
    /// backoff schedule.
    pub retry_base_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_base_ms: 1000,
        }
    }
}
