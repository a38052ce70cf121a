//! Shared constants for the pass kiosk.
//!
//! Timing values are expressed in milliseconds so they can be carried
//! verbatim in configuration files.

// ============================================================================
// Slots
// ============================================================================

/// Number of player slots on a standard two-player cabinet.
pub const DEFAULT_SLOT_COUNT: usize = 2;

/// Label prefix used when a profile carries no display name.
///
/// Rendered as `"{label} {slot}"` with a 1-based slot number.
pub const DEFAULT_FALLBACK_LABEL: &str = "Player";

// ============================================================================
// Pass identifiers
// ============================================================================

/// Minimum length of a pass identifier.
pub const MIN_PASS_ID_LENGTH: usize = 1;

/// Maximum length of a pass identifier.
///
/// Readers emit at most a 20-digit decimal serial; 64 leaves room for
/// prefixed or hexadecimal encodings.
pub const MAX_PASS_ID_LENGTH: usize = 64;

// ============================================================================
// Worker timing
// ============================================================================

/// Heartbeat of the hardware poll worker.
pub const DEFAULT_HARDWARE_HEARTBEAT_MS: u64 = 100;

/// Heartbeat of the network worker.
pub const DEFAULT_NETWORK_HEARTBEAT_MS: u64 = 100;

/// Fixed delay between hardware reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 500;

/// Time a slot may stay in `Downloading` before it is released.
///
/// `0` disables the timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// State history
// ============================================================================

/// Maximum number of transitions retained per slot.
///
/// A full association cycle is five transitions, so 100 entries keep the
/// last twenty sessions of a slot for diagnostics.
pub const MAX_HISTORY_SIZE: usize = 100;
