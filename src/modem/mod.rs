//! # Modem Communication Module
//!
//! Everything that touches the AT-command byte stream: the byte sources the
//! capture pipeline reads from, the line framer and message assembler built on
//! top of them, and the small device collaborators (discovery, initialization,
//! outbound SMS).
//!
//! ## Capture pipeline
//!
//! ```text
//! ByteSource ──► LineFramer ──► MessageAssembler ──► MessageSink (MessageLog)
//! ```
//!
//! The modem emits one burst of lines per event (header, blank separator,
//! body, terminator). [`MessageAssembler`] groups a burst into one
//! [`LogicalMessage`] by waiting for an idle gap longer than the settle window.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use std::time::Duration;
//! use air780e::modem::{LineFramer, MessageAssembler, ReaderSource};
//!
//! # fn main() -> air780e::error::Result<()> {
//! let source = ReaderSource::new(Cursor::new(b"+CIEV: \"MESSAGE\",1\r\n".to_vec()));
//! let mut messages = Vec::new();
//! MessageAssembler::new(LineFramer::new(source), Duration::from_millis(100))
//!     .run(&mut messages)?;
//! assert_eq!(messages.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::io::{self, Read};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

pub mod assembler;
pub mod commands;
pub mod discovery;
pub mod framer;
#[cfg(feature = "serial")]
pub mod serial;

pub use assembler::{
    AssemblerState, LogicalMessage, MessageAssembler, MessageSink, Step, DEFAULT_SETTLE_WINDOW,
};
pub use framer::{LineFramer, TimedLine};

/// A readable byte stream the framer can pull from.
///
/// The source is handed over ready to use; nothing here opens or configures
/// a device.
pub trait ByteSource {
    /// Block until at least one byte is available and copy up to `buf.len()`
    /// bytes into `buf`. `Ok(0)` means end-of-stream.
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Like [`ByteSource::read_blocking`] but waits at most `timeout`.
    /// `Ok(None)` means nothing arrived in time; `Ok(Some(0))` is end-of-stream.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_blocking(buf)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        (**self).read_timeout(buf, timeout)
    }
}

/// Adapts any [`Read`] as a byte source. Used for replaying captured bytes
/// from a file or buffer; such readers never idle, so a bounded read is a plain
/// read.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<Option<usize>> {
        self.read_blocking(buf).map(Some)
    }
}

/// Byte source fed by another thread through a channel of chunks.
/// A disconnected sender is end-of-stream.
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
        }
    }

    fn drain_into(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

impl ByteSource for ChannelSource {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        Ok(self.drain_into(buf))
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        if self.pending.is_empty() {
            match self.rx.recv_timeout(timeout) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Ok(Some(0)),
            }
            // Empty chunks carry no data; report them as an idle wait.
            if self.pending.is_empty() {
                return Ok(None);
            }
        }
        Ok(Some(self.drain_into(buf)))
    }
}
