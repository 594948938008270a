//! Configuration management for the toggle client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Validation before any client is built


use std::env;
use std::fmt::Debug;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use reqwest::Url;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "TOGGLE_CONFIG_PATH";

/// Prefix of environment variable overrides, e.g. `TOGGLE__APP_NAME`
pub const ENV_PREFIX: &str = "TOGGLE";

/// Toggle client settings
///
/// Combines defaults with overrides in this order (later wins):
/// 1. Default values from code implementation
/// 2. Configuration file specified by `TOGGLE_CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Ordered list of store endpoints, e.g. `http://127.0.0.1:4001`.
    /// The etcd fetcher tries them in order.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Namespace key of the application whose toggles are cached
    #[serde(default)]
    pub app_name: String,

    /// Period between two refresh cycles (seconds, at least 1)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_in_secs: u64,

    /// Directory under which every application namespace lives
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Upper bound for a single listing request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// Upper bound for establishing a connection to one endpoint
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Capacity of the error conduit; oldest events are dropped when full
    #[serde(default = "default_buffer_size")]
    pub error_buffer_size: usize,

    /// Capacity of the update conduit; oldest events are dropped when full
    #[serde(default = "default_buffer_size")]
    pub update_buffer_size: usize,
}

impl Debug for ClientConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoints", &self.endpoints)
            .field("app_name", &self.app_name)
            .field("refresh_interval_in_secs", &self.refresh_interval_in_secs)
            .finish_non_exhaustive()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            app_name: String::new(),
            refresh_interval_in_secs: default_refresh_interval(),
            key_prefix: default_key_prefix(),
            request_timeout_in_ms: default_request_timeout(),
            connect_timeout_in_ms: default_connect_timeout(),
            error_buffer_size: default_buffer_size(),
            update_buffer_size: default_buffer_size(),
        }
    }
}

impl ClientConfig {
    /// Config for one application with default transport settings.
    pub fn for_app(
        endpoints: Vec<String>,
        app_name: impl Into<String>,
        refresh_interval_in_secs: u64,
    ) -> Self {
        Self {
            endpoints,
            app_name: app_name.into(),
            refresh_interval_in_secs,
            ..Self::default()
        }
    }

    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so `with_override_config()` can still apply.
    /// Callers MUST call `validate()` before building a client.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("TOGGLE_CONFIG_PATH", "config/toggles.toml");
    /// std::env::set_var("TOGGLE__APP_NAME", "checkout");
    /// let cfg = ClientConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from a file, then the environment again.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns the validated instance.
    ///
    /// # Errors
    /// - empty or nested application name
    /// - refresh interval below one second
    /// - missing or malformed endpoints
    /// - zero timeouts or conduit capacities
    pub fn validate(self) -> Result<Self> {
        if self.app_name.trim().is_empty() {
            return Err(config_error("app_name must not be empty"));
        }
        if self.app_name.contains('/') {
            return Err(config_error(format!(
                "app_name {:?} must be a single path segment",
                self.app_name
            )));
        }
        if self.refresh_interval_in_secs < 1 {
            return Err(config_error("refresh_interval_in_secs must be at least 1"));
        }
        if self.endpoints.is_empty() {
            return Err(config_error("at least one endpoint is required"));
        }
        for endpoint in &self.endpoints {
            validate_endpoint(endpoint)?;
        }
        if self.request_timeout_in_ms < 1 {
            return Err(config_error("request_timeout_in_ms must be at least 1ms"));
        }
        if self.connect_timeout_in_ms < 1 {
            return Err(config_error("connect_timeout_in_ms must be at least 1ms"));
        }
        if self.error_buffer_size == 0 || self.update_buffer_size == 0 {
            return Err(config_error("notification buffer sizes must be greater than 0"));
        }
        Ok(self)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_in_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("endpoints")
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint)
        .map_err(|e| config_error(format!("invalid endpoint {endpoint:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(config_error(format!(
            "endpoint {endpoint:?} has unsupported scheme {scheme:?}"
        ))),
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Config(ConfigError::Message(message.into()))
}

fn default_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:4001".to_string()]
}
fn default_refresh_interval() -> u64 {
    1
}
fn default_key_prefix() -> String {
    "/v1/toggles".to_string()
}
// in ms
fn default_request_timeout() -> u64 {
    3000
}
fn default_connect_timeout() -> u64 {
    1000
}
fn default_buffer_size() -> usize {
    64
}
