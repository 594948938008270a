use std::time::Duration;

use super::ToggleClient;
use crate::ClientConfig;
use crate::EtcdFetcher;
use crate::Fetcher;
use crate::Result;

pub struct ToggleClientBuilder {
    config: ClientConfig,
}

impl ToggleClientBuilder {
    /// Create a new builder with default config for `app_name`
    pub fn new(
        endpoints: Vec<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            config: ClientConfig {
                endpoints,
                app_name: app_name.into(),
                ..ClientConfig::default()
            },
        }
    }

    /// Set refresh period, rounded down to whole seconds (default: 1s)
    pub fn refresh_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.config.refresh_interval_in_secs = interval.as_secs();
        self
    }

    /// Set the directory holding application namespaces (default: /v1/toggles)
    pub fn key_prefix(
        mut self,
        prefix: impl Into<String>,
    ) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set request timeout (default: 3s)
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.request_timeout_in_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set connection timeout (default: 1s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.connect_timeout_in_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set both notification conduit capacities (default: 64)
    pub fn notification_buffer(
        mut self,
        size: usize,
    ) -> Self {
        self.config.error_buffer_size = size;
        self.config.update_buffer_size = size;
        self
    }

    /// Completely replaces the configuration
    ///
    /// # Warning: Configuration Override
    /// This discards every setting applied through the other builder
    /// methods, including the endpoints and app name given to `new`.
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Build the client backed by the etcd fetcher
    pub fn build(self) -> Result<ToggleClient<EtcdFetcher>> {
        ToggleClient::from_config(self.config)
    }

    /// Build the client reading snapshots through `fetcher`
    pub fn build_with_fetcher<F: Fetcher>(
        self,
        fetcher: F,
    ) -> Result<ToggleClient<F>> {
        ToggleClient::with_fetcher(self.config, fetcher)
    }
}
