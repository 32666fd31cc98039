use std::time::Duration;

use crate::strategy::ConflictStrategy;

/// Registry timer intervals, conflict policy, and targeted-query timeout.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// How often local rows are broadcast as a registry sync message.
    pub sync_interval_secs: u64,
    /// How often expired rows are purged.
    pub cleanup_interval_secs: u64,
    /// How cross-station conflicts over the same node are resolved.
    pub conflict_strategy: ConflictStrategy,
    /// How long `query_node` waits for a remote response before giving up.
    pub query_timeout_secs: u64,
    /// When set, storage opens an in-memory SQLite database instead of a
    /// file-backed one.
    pub local_testing: bool,
}

impl RegistryConfig {
    /// The sync interval as a [`Duration`].
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// The cleanup interval as a [`Duration`].
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// The targeted-query timeout as a [`Duration`].
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 30,
            cleanup_interval_secs: 60,
            conflict_strategy: ConflictStrategy::default(),
            query_timeout_secs: 5,
            local_testing: false,
        }
    }
}
