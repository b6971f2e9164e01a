//! Configuration for a gateway session.
//!
//! Durations are stored in milliseconds so the struct deserialises directly
//! from TOML; `0` disables an optional timeout.
//!
//! ```toml
//! host = "10.0.0.5"
//! port = 13001
//! client_id = "sms-box"
//! window_size = 32
//! request_expiry_timeout_ms = 30000
//! ```

use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::codec::{DEFAULT_MAX_FRAME_LENGTH, clamp_frame_length};

/// Client id stamped on requests that carry none.
pub const DEFAULT_CLIENT_ID: &str = "bearerbox_client";
/// Default gateway port for boxes.
pub const DEFAULT_PORT: u16 = 13001;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_WINDOW_SIZE: usize = 1;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 1024;

/// Errors raised while loading a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration is not valid TOML or has unknown keys.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings shared by the connector, the session and its transport.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bearerbox::session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .client_id("sms-box")
///     .window_size(16)
///     .request_expiry_timeout(Duration::from_secs(30));
/// assert_eq!(config.window_size_value(), 16);
/// assert_eq!(
///     config.request_expiry_timeout_value(),
///     Some(Duration::from_secs(30))
/// );
/// assert_eq!(config.write_timeout_value(), None);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    host: String,
    port: u16,
    client_id: String,
    window_size: usize,
    connect_timeout_ms: u64,
    request_expiry_timeout_ms: u64,
    write_timeout_ms: u64,
    close_timeout_ms: u64,
    window_monitor_interval_ms: u64,
    max_frame_length: usize,
    write_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            window_size: DEFAULT_WINDOW_SIZE,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_expiry_timeout_ms: 0,
            write_timeout_ms: 0,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
            window_monitor_interval_ms: 0,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            write_queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
        }
    }
}

fn millis(duration: Duration) -> u64 { u64::try_from(duration.as_millis()).unwrap_or(u64::MAX) }

fn enabled(ms: u64) -> Option<Duration> { (ms > 0).then(|| Duration::from_millis(ms)) }

impl SessionConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> { Ok(toml::from_str(text)?) }

    /// Read and parse a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the id this box identifies with.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the number of requests that may be in flight at once.
    ///
    /// The value is clamped to at least one.
    #[must_use]
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = millis(timeout);
        self
    }

    /// Fail requests left unanswered for `timeout`. Zero disables expiry.
    #[must_use]
    pub fn request_expiry_timeout(mut self, timeout: Duration) -> Self {
        self.request_expiry_timeout_ms = millis(timeout);
        self
    }

    /// Fail writes that do not complete within `timeout`. Zero disables it.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = millis(timeout);
        self
    }

    #[must_use]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout_ms = millis(timeout);
        self
    }

    /// Log window occupancy every `interval`. Zero disables the monitor.
    #[must_use]
    pub fn window_monitor_interval(mut self, interval: Duration) -> Self {
        self.window_monitor_interval_ms = millis(interval);
        self
    }

    /// Set the maximum frame length, clamped between 64 bytes and 16 MiB.
    #[must_use]
    pub fn max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = clamp_frame_length(max_frame_length);
        self
    }

    /// Set how many writes may wait for the connection before further
    /// writes are refused. Clamped to at least one.
    #[must_use]
    pub fn write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn host_value(&self) -> &str { &self.host }

    #[must_use]
    pub const fn port_value(&self) -> u16 { self.port }

    #[must_use]
    pub fn client_id_value(&self) -> &str { &self.client_id }

    #[must_use]
    pub fn window_size_value(&self) -> usize { self.window_size.max(1) }

    #[must_use]
    pub const fn connect_timeout_value(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn request_expiry_timeout_value(&self) -> Option<Duration> {
        enabled(self.request_expiry_timeout_ms)
    }

    #[must_use]
    pub fn write_timeout_value(&self) -> Option<Duration> { enabled(self.write_timeout_ms) }

    #[must_use]
    pub const fn close_timeout_value(&self) -> Duration { Duration::from_millis(self.close_timeout_ms) }

    #[must_use]
    pub fn window_monitor_interval_value(&self) -> Option<Duration> {
        enabled(self.window_monitor_interval_ms)
    }

    #[must_use]
    pub fn max_frame_length_value(&self) -> usize { clamp_frame_length(self.max_frame_length) }

    #[must_use]
    pub fn write_queue_capacity_value(&self) -> usize { self.write_queue_capacity.max(1) }
}
