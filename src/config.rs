//! Typed bus configuration.
//!
//! Loaded once at startup from an optional TOML file. Every key has a
//! default, so an empty file (or no file) yields the demo's setup: one
//! queue named `test-queue` with the in-memory outbox enabled.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound for `poll_interval_ms`. A listener only notices `stop()`
/// between polls, so this also bounds shutdown latency.
pub const MAX_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Queue the work consumer listens on.
    pub queue_name: String,
    /// Wrap every delivery on the work queue in an in-memory outbox.
    pub use_in_memory_outbox: bool,
    /// How long a listener blocks waiting for a message before checking for
    /// shutdown.
    pub poll_interval_ms: u64,
    /// Prefix of every endpoint address.
    pub base_address: String,
    pub error_queue_suffix: String,
    pub skipped_queue_suffix: String,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Message type -> destination queue used by `send`.
    pub send_conventions: BTreeMap<String, String>,
}

impl Default for BusConfig {
    fn default() -> Self {
        let queue_name = "test-queue".to_string();
        let mut send_conventions = BTreeMap::new();
        send_conventions.insert("DoWork".to_string(), queue_name.clone());
        Self {
            queue_name,
            use_in_memory_outbox: true,
            poll_interval_ms: 10,
            base_address: "loopback://localhost".to_string(),
            error_queue_suffix: "_error".to_string(),
            skipped_queue_suffix: "_skipped".to_string(),
            log_level: "debug".to_string(),
            send_conventions,
        }
    }
}

impl BusConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_name.trim().is_empty() {
            return Err(ConfigError::Invalid("queue_name must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_ms must be at most {MAX_POLL_INTERVAL_MS}"
            )));
        }
        if self.error_queue_suffix.is_empty() || self.skipped_queue_suffix.is_empty() {
            return Err(ConfigError::Invalid("queue suffixes must not be empty".into()));
        }
        if self.error_queue_suffix == self.skipped_queue_suffix {
            return Err(ConfigError::Invalid(
                "error and skipped queue suffixes must differ".into(),
            ));
        }
        if let Some((message_type, _)) = self.send_conventions.iter().find(|(_, q)| q.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "send convention for {message_type} has an empty queue"
            )));
        }
        Ok(())
    }

    /// Rename the work queue. Conventions pointing at the old name follow.
    pub fn with_queue_name(mut self, queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        for queue in self.send_conventions.values_mut() {
            if *queue == self.queue_name {
                *queue = queue_name.clone();
            }
        }
        self.queue_name = queue_name;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_queue(&self, queue: &str) -> String {
        format!("{queue}{}", self.error_queue_suffix)
    }

    pub fn skipped_queue(&self, queue: &str) -> String {
        format!("{queue}{}", self.skipped_queue_suffix)
    }

    /// Address of a named endpoint.
    pub fn address(&self, name: &str) -> String {
        format!("{}/{name}", self.base_address.trim_end_matches('/'))
    }
}
