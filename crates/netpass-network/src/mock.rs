//! In-memory profile service.
//!
//! [`MemoryTransferClient`] stands in for the remote profile service in tests
//! and in the demo binary. Clones share the same store, so a test can keep
//! one clone to inspect uploads and inject failures while the worker thread
//! owns another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use netpass_core::PassId;
use tracing::trace;

use crate::client::TransferClient;
use crate::error::{Result, TransferError};

#[derive(Debug, Clone)]
struct StoredProfile {
    stats: Bytes,
    editable: Option<Bytes>,
}

#[derive(Debug, Default)]
struct Store {
    profiles: HashMap<PassId, StoredProfile>,
    auto_provision: bool,
    fail_stats: bool,
    fail_editable: bool,
    fail_uploads: bool,
    latency: Duration,
    requests: usize,
    uploads: Vec<(PassId, Bytes)>,
}

/// Profile service backed by a shared in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransferClient {
    store: Arc<Mutex<Store>>,
}

impl MemoryTransferClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer unknown passes with an empty profile instead of `NotFound`.
    #[must_use]
    pub fn with_auto_provision(self) -> Self {
        self.lock().auto_provision = true;
        self
    }

    /// Delay every call by `latency`, to simulate a slow service.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a profile for a pass, replacing any existing one.
    pub fn insert_profile(&self, id: PassId, stats: impl Into<Bytes>, editable: Option<Bytes>) {
        self.lock().profiles.insert(
            id,
            StoredProfile {
                stats: stats.into(),
                editable,
            },
        );
    }

    pub fn fail_stats(&self, fail: bool) {
        self.lock().fail_stats = fail;
    }

    pub fn fail_editable(&self, fail: bool) {
        self.lock().fail_editable = fail;
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.lock().fail_uploads = fail;
    }

    /// Current stats document stored for a pass.
    pub fn stats_for(&self, id: &PassId) -> Option<Bytes> {
        self.lock().profiles.get(id).map(|p| p.stats.clone())
    }

    /// Every accepted upload, oldest first.
    pub fn uploads(&self) -> Vec<(PassId, Bytes)> {
        self.lock().uploads.clone()
    }

    /// Number of calls made against the service, failed ones included.
    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    // Counts the request and sleeps outside the lock.
    fn begin_request(&self, call: &'static str, id: &PassId) {
        let latency = {
            let mut store = self.lock();
            store.requests += 1;
            store.latency
        };
        trace!(call, pass = %id, "memory transfer request");
        if !latency.is_zero() {
            thread::sleep(latency);
        }
    }

    fn profile(&self, id: &PassId) -> Result<StoredProfile> {
        let mut store = self.lock();
        if let Some(profile) = store.profiles.get(id) {
            return Ok(profile.clone());
        }
        if !store.auto_provision {
            return Err(TransferError::not_found(id.as_str()));
        }
        let profile = StoredProfile {
            stats: Bytes::new(),
            editable: None,
        };
        store.profiles.insert(id.clone(), profile.clone());
        Ok(profile)
    }
}

impl TransferClient for MemoryTransferClient {
    fn fetch_stats(&mut self, id: &PassId) -> Result<Bytes> {
        self.begin_request("fetch_stats", id);
        if self.lock().fail_stats {
            return Err(TransferError::connection("injected stats failure"));
        }
        Ok(self.profile(id)?.stats)
    }

    fn fetch_editable(&mut self, id: &PassId) -> Result<Bytes> {
        self.begin_request("fetch_editable", id);
        if self.lock().fail_editable {
            return Err(TransferError::connection("injected editable failure"));
        }
        self.profile(id)?
            .editable
            .ok_or_else(|| TransferError::not_found(id.as_str()))
    }

    fn upload(&mut self, id: &PassId, stats: &Bytes) -> Result<()> {
        self.begin_request("upload", id);
        let mut store = self.lock();
        if store.fail_uploads {
            return Err(TransferError::rejected(503, "injected upload failure"));
        }

        let editable = store.profiles.get(id).and_then(|p| p.editable.clone());
        store.profiles.insert(
            id.clone(),
            StoredProfile {
                stats: stats.clone(),
                editable,
            },
        );
        store.uploads.push((id.clone(), stats.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> PassId {
        PassId::new(raw).unwrap()
    }

    #[test]
    fn test_unknown_pass_not_found() {
        let mut client = MemoryTransferClient::new();
        assert!(matches!(
            client.download(&id("A")),
            Err(TransferError::NotFound { .. })
        ));
    }

    #[test]
    fn test_auto_provision_creates_empty_profile() {
        let mut client = MemoryTransferClient::new().with_auto_provision();
        let bundle = client.download(&id("A")).unwrap();

        assert!(bundle.stats().is_empty());
        assert!(bundle.editable().is_none());
        assert_eq!(client.stats_for(&id("A")), Some(Bytes::new()));
    }

    #[test]
    fn test_editable_failure_keeps_stats() {
        let mut client = MemoryTransferClient::new();
        client.insert_profile(id("A"), "<Stats/>", Some(Bytes::from_static(b"{}")));
        client.fail_editable(true);

        let bundle = client.download(&id("A")).unwrap();
        assert_eq!(bundle.stats().as_ref(), b"<Stats/>");
        assert!(bundle.editable().is_none());
        assert_eq!(client.request_count(), 2);
    }

    #[test]
    fn test_clones_share_store() {
        let observer = MemoryTransferClient::new();
        let mut worker_side = observer.clone();

        worker_side
            .upload(&id("A"), &Bytes::from_static(b"<Stats/>"))
            .unwrap();

        assert_eq!(observer.uploads().len(), 1);
        assert_eq!(
            observer.stats_for(&id("A")),
            Some(Bytes::from_static(b"<Stats/>"))
        );
    }

    #[test]
    fn test_upload_keeps_editable_document() {
        let mut client = MemoryTransferClient::new();
        let editable = Bytes::from_static(br#"{"display_name":"MAX"}"#);
        client.insert_profile(id("A"), "old", Some(editable.clone()));

        client.upload(&id("A"), &Bytes::from_static(b"new")).unwrap();
        assert_eq!(client.fetch_editable(&id("A")).unwrap(), editable);
    }

    #[test]
    fn test_injected_upload_failure() {
        let mut client = MemoryTransferClient::new();
        client.fail_uploads(true);

        assert!(matches!(
            client.upload(&id("A"), &Bytes::new()),
            Err(TransferError::Rejected { status: 503, .. })
        ));
        assert!(client.uploads().is_empty());
    }
}
