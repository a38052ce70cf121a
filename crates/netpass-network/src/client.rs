//! Profile transfer client abstraction.
//!
//! The wire protocol to the profile service is not part of this crate. A
//! [`TransferClient`] exposes the three calls the network worker needs and
//! builds the two-step download on top of them.
//!
//! Calls are blocking and run on the network worker's thread only. The
//! client applies whatever timeout its transport supports; the worker adds
//! none of its own.

use bytes::Bytes;
use netpass_core::{PassId, ProfileBundle};
use tracing::warn;

use crate::error::Result;

/// Blocking access to the remote profile service.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use netpass_core::PassId;
/// use netpass_network::{MemoryTransferClient, TransferClient};
///
/// let mut client = MemoryTransferClient::new();
/// let id = PassId::new("0004417023").unwrap();
/// client.insert_profile(id.clone(), "<Stats/>", Some(Bytes::from_static(br#"{"display_name":"RIKU"}"#)));
///
/// let bundle = client.download(&id).unwrap();
/// assert_eq!(bundle.display_name().as_deref(), Some("RIKU"));
/// ```
pub trait TransferClient: Send {
    /// Fetch the stats document for a pass.
    ///
    /// # Errors
    /// Returns an error if the service is unreachable or has no profile.
    fn fetch_stats(&mut self, id: &PassId) -> Result<Bytes>;

    /// Fetch the editable metadata document for a pass.
    ///
    /// # Errors
    /// Returns an error if the service is unreachable or has no metadata.
    fn fetch_editable(&mut self, id: &PassId) -> Result<Bytes>;

    /// Store a new stats document for a pass.
    ///
    /// # Errors
    /// Returns an error if the service did not acknowledge the upload.
    fn upload(&mut self, id: &PassId, stats: &Bytes) -> Result<()>;

    /// Download a full profile bundle.
    ///
    /// The stats document is required. The metadata fetch is allowed to fail:
    /// the bundle is then returned without it and the failure is logged.
    ///
    /// # Errors
    /// Returns the stats fetch error.
    fn download(&mut self, id: &PassId) -> Result<ProfileBundle> {
        let stats = self.fetch_stats(id)?;
        let editable = match self.fetch_editable(id) {
            Ok(document) => Some(document),
            Err(e) => {
                warn!(pass = %id, error = %e, "editable metadata unavailable, keeping stats");
                None
            }
        };
        Ok(ProfileBundle::new(stats, editable))
    }
}

impl<T: TransferClient + ?Sized> TransferClient for Box<T> {
    fn fetch_stats(&mut self, id: &PassId) -> Result<Bytes> {
        (**self).fetch_stats(id)
    }

    fn fetch_editable(&mut self, id: &PassId) -> Result<Bytes> {
        (**self).fetch_editable(id)
    }

    fn upload(&mut self, id: &PassId, stats: &Bytes) -> Result<()> {
        (**self).upload(id, stats)
    }

    fn download(&mut self, id: &PassId) -> Result<ProfileBundle> {
        (**self).download(id)
    }
}
