//! Transport abstraction: any byte-oriented channel.
//!
//! Concrete implementations:
//! - UART serial (the command/telemetry port)
//! - in-memory loopback for host tests
//!
//! The serial event sink and the command poller are generic over
//! `Transport`, so the telemetry path runs unchanged under test.

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;
}

/// Write all of `data`, retrying short writes.  Gives up (returning the
/// error) on the first transport error or a zero-length write.
pub fn write_all<T: Transport>(t: &mut T, mut data: &[u8]) -> Result<(), Option<T::Error>> {
    while !data.is_empty() {
        match t.write(data) {
            Ok(0) => return Err(None),
            Ok(n) => data = &data[n..],
            Err(e) => return Err(Some(e)),
        }
    }
    Ok(())
}
