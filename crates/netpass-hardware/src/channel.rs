//! Hardware channel abstraction.
//!
//! A [`HardwareChannel`] is the byte-level link to a token reader, reduced to
//! the three operations the poll worker needs. Implementations decode the
//! reader's wire format themselves and hand back one token per line.
//!
//! The methods are blocking. They are only ever called from the hardware
//! poll worker's own thread, never from the real-time tick.

use crate::error::Result;

/// Result of a single blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete newline-terminated token, without the terminator.
    Line(String),

    /// The read timed out with nothing to report. Not a failure.
    NoData,
}

/// Blocking link to a token reader.
///
/// A read error (`Err`) means the channel is broken and must be reopened;
/// "nothing scanned yet" is reported as [`ReadOutcome::NoData`] instead so
/// the caller can tell the two apart.
///
/// # Examples
///
/// ```
/// use netpass_hardware::{HardwareChannel, ReadOutcome};
/// use netpass_hardware::mock::MockChannel;
///
/// let (mut channel, handle) = MockChannel::new();
/// channel.open().unwrap();
///
/// handle.present("0004417023").unwrap();
/// assert_eq!(
///     channel.read_line().unwrap(),
///     ReadOutcome::Line("0004417023".to_string())
/// );
/// ```
pub trait HardwareChannel: Send {
    /// Open the device.
    ///
    /// # Errors
    /// Returns an error if the device is missing or refuses the connection.
    fn open(&mut self) -> Result<()>;

    /// Block until a full token line is read or the read times out.
    ///
    /// # Errors
    /// Returns an error if the channel failed; the caller reconnects.
    fn read_line(&mut self) -> Result<ReadOutcome>;

    /// Close the device. Closing an already closed channel is a no-op.
    fn close(&mut self);

    /// Human readable device name for logs.
    fn name(&self) -> &str;
}

impl<C: HardwareChannel + ?Sized> HardwareChannel for Box<C> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read_line(&mut self) -> Result<ReadOutcome> {
        (**self).read_line()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
