//! Scanned passes.
//!
//! A [`Pass`] is the value object produced when a physical token is read.
//! It wraps a validated [`PassId`] and the wall-clock time of the scan.
//! Two passes are equal when their identifiers are equal; the scan time is
//! informational only.

use crate::{
    Result,
    constants::{MAX_PASS_ID_LENGTH, MIN_PASS_ID_LENGTH},
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Unique token identifier carried by a pass.
///
/// Identifiers are trimmed on construction and must be 1-64 printable ASCII
/// characters without embedded whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PassId(String);

impl PassId {
    /// Create a new pass identifier with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPass` if the trimmed identifier is empty, too
    /// long, or contains characters outside printable ASCII.
    pub fn new(raw: &str) -> Result<Self> {
        let id = raw.trim();

        let len = id.len();
        if !(MIN_PASS_ID_LENGTH..=MAX_PASS_ID_LENGTH).contains(&len) {
            return Err(Error::InvalidPass(format!(
                "identifier must be {MIN_PASS_ID_LENGTH}-{MAX_PASS_ID_LENGTH} chars, got {len}"
            )));
        }

        if !id.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::InvalidPass(format!(
                "identifier must be printable ASCII without spaces: {id:?}"
            )));
        }

        Ok(PassId(id.to_string()))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PassId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PassId::new(s)
    }
}

impl TryFrom<String> for PassId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        PassId::new(&value)
    }
}

impl From<PassId> for String {
    fn from(id: PassId) -> Self {
        id.0
    }
}

impl From<u64> for PassId {
    fn from(value: u64) -> Self {
        PassId(value.to_string())
    }
}

/// A scanned token identifying a returning player.
///
/// Immutable after construction. Ownership moves from the token queue to
/// the slot that accepts it; the network worker only ever sees clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pass {
    id: PassId,
    scanned_at: DateTime<Utc>,
}

impl Pass {
    /// Create a pass from the raw text emitted by a reader.
    ///
    /// # Errors
    /// Returns `Error::InvalidPass` when the text is not a valid identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use netpass_core::Pass;
    ///
    /// let pass = Pass::new(" 0004417023\n").unwrap();
    /// assert_eq!(pass.id().as_str(), "0004417023");
    /// ```
    pub fn new(raw: &str) -> Result<Self> {
        Ok(Self::from_id(PassId::new(raw)?))
    }

    /// Create a pass from a numeric token serial.
    #[must_use]
    pub fn from_numeric(serial: u64) -> Self {
        Self::from_id(PassId::from(serial))
    }

    /// Create a pass from an already validated identifier, stamped now.
    #[must_use]
    pub fn from_id(id: PassId) -> Self {
        Self {
            id,
            scanned_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &PassId {
        &self.id
    }

    /// When the token was read.
    #[must_use]
    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }
}

impl PartialEq for Pass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Pass {}

impl Hash for Pass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
