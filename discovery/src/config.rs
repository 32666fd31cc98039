use std::time::Duration;

/// Configuration for the directory client, mirroring the `DISCOVERY_*`
/// environment variables.
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// The directory service's base URL.
    pub discovery_url: String,
    timeout_secs: u64,
    check_interval_secs: u64,
    /// When set, public IP acquisition always resolves to `127.0.0.1`.
    pub local_testing: bool,
}

impl DiscoveryConfig {
    /// Per-HTTP-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Heartbeat / peer-poll period.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            discovery_url: "https://directory.example.invalid".to_string(),
            timeout_secs: 30,
            check_interval_secs: 300,
            local_testing: false,
        }
    }
}

/// Builder for [`DiscoveryConfig`].
#[derive(Clone, Debug, Default)]
pub struct DiscoveryConfigBuilder {
    config: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    /// Starts from [`DiscoveryConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory base URL.
    pub fn discovery_url(mut self, url: impl Into<String>) -> Self {
        self.config.discovery_url = url.into();
        self
    }

    /// Sets the per-call timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Sets the heartbeat/poll period in seconds.
    pub fn check_interval_secs(mut self, secs: u64) -> Self {
        self.config.check_interval_secs = secs;
        self
    }

    /// Sets local-testing mode.
    pub fn local_testing(mut self, enabled: bool) -> Self {
        self.config.local_testing = enabled;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> DiscoveryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.check_interval(), Duration::from_secs(300));
        assert!(!config.local_testing);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = DiscoveryConfigBuilder::new()
            .timeout_secs(5)
            .check_interval_secs(10)
            .local_testing(true)
            .build();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.check_interval(), Duration::from_secs(10));
        assert!(config.local_testing);
    }
}
