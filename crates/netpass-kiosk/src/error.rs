//! Error types for the kiosk orchestration layer.

use std::path::PathBuf;

use netpass_core::{SlotIndex, SlotState};
use netpass_hardware::HardwareError;
use netpass_network::TransferError;

/// Result type alias for kiosk operations.
pub type Result<T> = std::result::Result<T, KioskError>;

/// Errors returned to the collaborators that drive the kiosk.
///
/// Policy rejections (late join, duplicate scan, no free slot) are not
/// errors; they surface as notifications.
#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    /// The slot does not hold a downloaded profile.
    #[error("Slot {slot} has no profile ready (state {state})")]
    NotReady { slot: SlotIndex, state: SlotState },

    /// The slot index is outside the configured slot table.
    #[error("Slot index {slot} out of range (slot count {count})")]
    InvalidSlot { slot: usize, count: usize },

    /// The profile could not be merged into the caller's profile object.
    #[error("Profile load failed: {message}")]
    ProfileLoad { message: String },

    /// Configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] netpass_core::Error),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl KioskError {
    pub fn profile_load(message: impl Into<String>) -> Self {
        Self::ProfileLoad {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_message() {
        let error = KioskError::NotReady {
            slot: SlotIndex::new(0),
            state: SlotState::Downloading,
        };
        assert_eq!(
            error.to_string(),
            "Slot P1 has no profile ready (state Downloading)"
        );
    }

    #[test]
    fn test_lower_errors_convert() {
        let error: KioskError = HardwareError::disconnected("reader").into();
        assert!(matches!(error, KioskError::Hardware(_)));

        let error: KioskError = TransferError::connection("refused").into();
        assert_eq!(error.to_string(), "Connection failed: refused");
    }
}
