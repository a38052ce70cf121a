//! Downloaded profile data ("biscuit").
//!
//! A [`ProfileBundle`] holds the two documents returned by the profile
//! service: an opaque stats document and an editable metadata document.
//! The metadata document is optional because the service fetches it in a
//! second request that may fail independently of the first.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Player-editable metadata stored alongside the stats document.
///
/// Encoded as a JSON object; every field is optional so partially filled
/// documents from older kiosks still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditableMetadata {
    /// Name shown on screen while the profile is loaded.
    pub display_name: Option<String>,

    /// Initials last entered on a high score screen.
    pub last_used_high_score_name: Option<String>,

    /// Body weight used for calorie estimates.
    pub weight_pounds: Option<u32>,
}

impl EditableMetadata {
    /// Parse an editable metadata document.
    ///
    /// # Errors
    /// Returns `Error::InvalidDocument` if the bytes are not a JSON object of
    /// the expected shape.
    pub fn parse(document: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(document)?)
    }

    /// Encode the metadata as a JSON document.
    ///
    /// # Errors
    /// Returns `Error::InvalidDocument` if serialization fails.
    pub fn to_document(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Display name with surrounding whitespace removed, if non-empty.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Profile data downloaded for a pass.
///
/// Owned by exactly one holder at a time: the network worker while it is
/// being fetched or uploaded, the slot while the profile is in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBundle {
    stats: Bytes,
    editable: Option<Bytes>,
}

impl ProfileBundle {
    /// Create a bundle from the stats document and an optional metadata document.
    pub fn new(stats: impl Into<Bytes>, editable: Option<Bytes>) -> Self {
        Self {
            stats: stats.into(),
            editable,
        }
    }

    /// The opaque stats document.
    #[must_use]
    pub fn stats(&self) -> &Bytes {
        &self.stats
    }

    /// The raw editable metadata document, if it was downloaded.
    #[must_use]
    pub fn editable(&self) -> Option<&Bytes> {
        self.editable.as_ref()
    }

    /// Parsed editable metadata.
    ///
    /// Returns `None` when the document is missing or malformed.
    #[must_use]
    pub fn editable_metadata(&self) -> Option<EditableMetadata> {
        let document = self.editable.as_ref()?;
        match EditableMetadata::parse(document) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed editable document");
                None
            }
        }
    }

    /// Display name from the editable metadata, if present.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        self.editable_metadata()
            .and_then(|metadata| metadata.display_name().map(str::to_string))
    }

    /// Replace the stats document, keeping the editable metadata.
    #[must_use]
    pub fn with_stats(mut self, stats: impl Into<Bytes>) -> Self {
        self.stats = stats.into();
        self
    }
}
