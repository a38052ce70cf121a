//! Kiosk configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file, or
//! no file at all, yields a working two-slot kiosk:
//!
//! ```toml
//! slots = 2
//! reject_mode = "continue"
//! download_timeout_ms = 30000
//! fallback_label = "Player"
//!
//! [hardware]
//! heartbeat_ms = 100
//! reconnect_delay_ms = 500
//! reconnect_on_startup = true
//!
//! [network]
//! heartbeat_ms = 100
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use netpass_core::constants::{
    DEFAULT_DOWNLOAD_TIMEOUT_MS, DEFAULT_FALLBACK_LABEL, DEFAULT_HARDWARE_HEARTBEAT_MS,
    DEFAULT_NETWORK_HEARTBEAT_MS, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SLOT_COUNT,
};
use netpass_hardware::{PollWorkerConfig, ReconnectPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{KioskError, Result};

/// What to do with the rest of a scan batch after a token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectMode {
    /// Judge every queued token on its own.
    #[default]
    Continue,

    /// Drop the remaining tokens of the batch after the first rejection.
    DiscardRemaining,
}

/// Top-level kiosk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Number of player slots.
    pub slots: usize,

    pub reject_mode: RejectMode,

    /// Time a slot may wait for its download before it is released.
    /// `0` waits forever.
    pub download_timeout_ms: u64,

    /// Label prefix for profiles without a display name.
    pub fallback_label: String,

    pub hardware: HardwareConfig,

    pub network: NetworkConfig,
}

/// Token reader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub heartbeat_ms: u64,
    pub reconnect_delay_ms: u64,
    /// Keep retrying when the reader is missing at startup.
    pub reconnect_on_startup: bool,
}

/// Profile service worker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub heartbeat_ms: u64,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOT_COUNT,
            reject_mode: RejectMode::default(),
            download_timeout_ms: DEFAULT_DOWNLOAD_TIMEOUT_MS,
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
            hardware: HardwareConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: DEFAULT_HARDWARE_HEARTBEAT_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            reconnect_on_startup: true,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: DEFAULT_NETWORK_HEARTBEAT_MS,
        }
    }
}

impl KioskConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    /// Returns `KioskError::ConfigParse` for malformed TOML and
    /// `KioskError::InvalidConfig` for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    /// Returns `KioskError::ConfigRead` if the file cannot be read, otherwise
    /// the errors of [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| KioskError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `KioskError::InvalidConfig` for zero slots or a zero heartbeat.
    pub fn validate(&self) -> Result<()> {
        if self.slots == 0 {
            return Err(KioskError::invalid_config("slots must be at least 1"));
        }
        if self.hardware.heartbeat_ms == 0 {
            return Err(KioskError::invalid_config(
                "hardware.heartbeat_ms must be greater than 0",
            ));
        }
        if self.network.heartbeat_ms == 0 {
            return Err(KioskError::invalid_config(
                "network.heartbeat_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Download timeout, or `None` when disabled.
    pub fn download_timeout(&self) -> Option<Duration> {
        (self.download_timeout_ms > 0).then(|| Duration::from_millis(self.download_timeout_ms))
    }

    pub fn network_heartbeat(&self) -> Duration {
        Duration::from_millis(self.network.heartbeat_ms)
    }

    pub fn poll_worker_config(&self) -> PollWorkerConfig {
        PollWorkerConfig {
            heartbeat: Duration::from_millis(self.hardware.heartbeat_ms),
            reconnect: ReconnectPolicy::fixed(Duration::from_millis(
                self.hardware.reconnect_delay_ms,
            )),
            reconnect_on_startup: self.hardware.reconnect_on_startup,
        }
    }
}
