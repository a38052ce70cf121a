//! Heartbeat-driven worker threads.
//!
//! A [`WorkerThread`] runs a closure on a dedicated, named OS thread once
//! per heartbeat until it is asked to stop. Shutdown is cooperative: the
//! closure receives a [`ShutdownSignal`] it can poll inside long-running
//! loops, and [`WorkerThread::stop`] waits for the beat in progress to
//! return. An in-flight blocking call is never interrupted, so stopping may
//! take up to one blocking read or one network round trip.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use crate::{Error, Result};

/// Cooperative shutdown flag shared between a worker and its owner.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop at its next loop boundary.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, waking early in slices of at most 50ms
    /// to notice a shutdown request.
    ///
    /// Returns `true` if shutdown was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(50);

        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_requested() {
                return true;
            }
            let step = remaining.min(SLICE);
            thread::sleep(step);
            remaining -= step;
        }
        self.is_requested()
    }
}

/// A named OS thread invoking a closure once per heartbeat.
///
/// Dropping the worker stops it and joins the thread.
///
/// # Examples
///
/// ```
/// use netpass_core::WorkerThread;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let beats = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&beats);
///
/// let mut worker = WorkerThread::spawn("counter", Duration::from_millis(5), move |_| {
///     counter.fetch_add(1, Ordering::Relaxed);
/// })
/// .unwrap();
///
/// std::thread::sleep(Duration::from_millis(50));
/// worker.stop();
/// assert!(beats.load(Ordering::Relaxed) > 0);
/// ```
#[derive(Debug)]
pub struct WorkerThread {
    name: String,
    heartbeat: Duration,
    shutdown: ShutdownSignal,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawn a worker that calls `beat` every `heartbeat`.
    ///
    /// The first beat runs immediately. Between beats the thread parks for
    /// the heartbeat interval; [`stop`](Self::stop) unparks it early.
    ///
    /// # Errors
    /// Returns `Error::WorkerSpawn` if the OS refuses to create the thread.
    pub fn spawn<F>(name: impl Into<String>, heartbeat: Duration, mut beat: F) -> Result<Self>
    where
        F: FnMut(&ShutdownSignal) + Send + 'static,
    {
        let name = name.into();
        let shutdown = ShutdownSignal::new();
        let signal = shutdown.clone();
        let thread_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                debug!(worker = %thread_name, "worker started");
                while !signal.is_requested() {
                    beat(&signal);
                    if signal.is_requested() {
                        break;
                    }
                    thread::park_timeout(heartbeat);
                }
                debug!(worker = %thread_name, "worker stopped");
            })
            .map_err(|source| Error::WorkerSpawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            heartbeat,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// A clone of the worker's shutdown flag.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Signal the worker to stop and wait for the current beat to finish.
    pub fn stop(&mut self) {
        self.shutdown.request();
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                error!(worker = %self.name, "worker thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_requested() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop();
    }
}
