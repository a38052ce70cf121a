//! Mock token reader for testing and development.
//!
//! [`MockChannel`] implements [`HardwareChannel`] on top of an in-process
//! queue. The paired [`MockChannelHandle`] presents tokens, injects read
//! failures and makes open attempts fail, which is everything needed to
//! exercise the poll worker's reconnect loop without a physical scanner.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::channel::{HardwareChannel, ReadOutcome};
use crate::error::{HardwareError, Result};

/// Default time a mock read blocks before reporting `NoData`.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Internal event type for the mock reader.
#[derive(Debug, Clone)]
enum ReaderEvent {
    Line(String),
    ReadFailure(String),
}

#[derive(Debug, Default)]
struct Controls {
    is_open: bool,
    failing_opens: u32,
    open_attempts: u32,
    open_count: u32,
}

type SharedControls = Arc<Mutex<Controls>>;

fn lock(controls: &SharedControls) -> MutexGuard<'_, Controls> {
    controls.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock token reader.
///
/// # Examples
///
/// ```
/// use netpass_hardware::mock::MockChannel;
/// use netpass_hardware::{HardwareChannel, ReadOutcome};
///
/// let (mut reader, handle) = MockChannel::new();
/// reader.open().unwrap();
///
/// handle.present("A").unwrap();
/// assert_eq!(reader.read_line().unwrap(), ReadOutcome::Line("A".into()));
///
/// handle.inject_read_failure().unwrap();
/// assert!(reader.read_line().is_err());
/// ```
#[derive(Debug)]
pub struct MockChannel {
    event_rx: mpsc::Receiver<ReaderEvent>,
    name: String,
    read_timeout: Duration,
    controls: SharedControls,
}

impl MockChannel {
    /// Create a new mock reader with the default name and read timeout.
    pub fn new() -> (Self, MockChannelHandle) {
        Self::build("Mock Pass Reader".to_string(), DEFAULT_READ_TIMEOUT)
    }

    /// Create a mock reader whose reads give up after `read_timeout`.
    pub fn with_read_timeout(read_timeout: Duration) -> (Self, MockChannelHandle) {
        Self::build("Mock Pass Reader".to_string(), read_timeout)
    }

    /// Create a mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockChannelHandle) {
        Self::build(name, DEFAULT_READ_TIMEOUT)
    }

    fn build(name: String, read_timeout: Duration) -> (Self, MockChannelHandle) {
        let (event_tx, event_rx) = mpsc::channel();
        let controls = SharedControls::default();

        let reader = Self {
            event_rx,
            name,
            read_timeout,
            controls: Arc::clone(&controls),
        };

        let handle = MockChannelHandle { event_tx, controls };

        (reader, handle)
    }

    // The reader holds one reference; every live handle holds another.
    fn handles_alive(&self) -> bool {
        Arc::strong_count(&self.controls) > 1
    }
}

impl HardwareChannel for MockChannel {
    fn open(&mut self) -> Result<()> {
        let handles_alive = self.handles_alive();
        let mut controls = lock(&self.controls);
        controls.open_attempts += 1;

        if !handles_alive {
            return Err(HardwareError::open_failed("mock reader unplugged"));
        }

        if controls.failing_opens > 0 {
            controls.failing_opens -= 1;
            return Err(HardwareError::open_failed("mock open failure"));
        }

        controls.is_open = true;
        controls.open_count += 1;
        Ok(())
    }

    fn read_line(&mut self) -> Result<ReadOutcome> {
        if !lock(&self.controls).is_open {
            return Err(HardwareError::disconnected(self.name.clone()));
        }

        match self.event_rx.recv_timeout(self.read_timeout) {
            Ok(ReaderEvent::Line(line)) => Ok(ReadOutcome::Line(line)),
            Ok(ReaderEvent::ReadFailure(message)) => {
                lock(&self.controls).is_open = false;
                Err(HardwareError::communication(message))
            }
            Err(RecvTimeoutError::Timeout) => Ok(ReadOutcome::NoData),
            Err(RecvTimeoutError::Disconnected) => {
                lock(&self.controls).is_open = false;
                Err(HardwareError::disconnected(self.name.clone()))
            }
        }
    }

    fn close(&mut self) {
        lock(&self.controls).is_open = false;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for controlling a mock reader.
///
/// Cloneable; the reader reports itself unplugged once every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct MockChannelHandle {
    event_tx: mpsc::Sender<ReaderEvent>,
    controls: SharedControls,
}

impl MockChannelHandle {
    /// Present a token to the reader, as if a pass was swiped.
    ///
    /// # Errors
    /// Returns an error if the reader has been dropped.
    pub fn present(&self, token: impl Into<String>) -> Result<()> {
        self.send(ReaderEvent::Line(token.into()))
    }

    /// Make the next read fail, as if the USB cable was pulled mid-read.
    ///
    /// # Errors
    /// Returns an error if the reader has been dropped.
    pub fn inject_read_failure(&self) -> Result<()> {
        self.send(ReaderEvent::ReadFailure("mock read failure".to_string()))
    }

    /// Make the next `count` open attempts fail.
    pub fn fail_next_opens(&self, count: u32) {
        lock(&self.controls).failing_opens = count;
    }

    /// Number of open attempts, successful or not.
    pub fn open_attempts(&self) -> u32 {
        lock(&self.controls).open_attempts
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> u32 {
        lock(&self.controls).open_count
    }

    pub fn is_open(&self) -> bool {
        lock(&self.controls).is_open
    }

    fn send(&self, event: ReaderEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|_| HardwareError::disconnected("mock reader dropped"))
    }
}
