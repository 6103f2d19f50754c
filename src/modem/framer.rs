//! Incremental LF line framer for the AT byte stream.
//!
//! The modem terminates every line with `\r\n`; only the `\n` matters here.
//! Bytes are opaque: no text encoding is assumed and the terminator stays
//! part of the returned line. Partial data is kept in the buffer until its
//! terminator arrives, so splitting the stream differently across reads never
//! changes the lines produced.
use bytes::BytesMut;
use log::{debug, trace};
use std::time::{Duration, Instant};

use super::ByteSource;
use crate::error::{BridgeError, Result};
use crate::logutil::{escape_bytes, hex_snippet};
use crate::metrics;

/// Size of a single read from the source.
const READ_CHUNK: usize = 4096;

/// Outcome of [`LineFramer::read_line_with_timeout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimedLine {
    /// A complete line, terminator included.
    Line(Vec<u8>),
    /// No complete line arrived within the timeout. Buffered bytes are kept.
    Idle,
    /// The source reached end-of-stream.
    Eof,
}

pub struct LineFramer<S> {
    source: S,
    buf: BytesMut,
    eof: bool,
}

impl<S: ByteSource> LineFramer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buf: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    /// Bytes received but not yet returned as part of a line.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Block until a full line is available. `Ok(None)` at end-of-stream; an
    /// unterminated remainder at that point is never returned.
    pub fn read_line_blocking(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.next_line() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }
            let n = self
                .source
                .read_blocking(&mut chunk)
                .map_err(BridgeError::StreamRead)?;
            if n == 0 {
                self.mark_eof();
                return Ok(None);
            }
            self.absorb(&chunk[..n]);
        }
    }

    /// Return the next full line if one completes within `timeout`.
    pub fn read_line_with_timeout(&mut self, timeout: Duration) -> Result<TimedLine> {
        if let Some(line) = self.next_line() {
            return Ok(TimedLine::Line(line));
        }
        if self.eof {
            return Ok(TimedLine::Eof);
        }
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self
                .source
                .read_timeout(&mut chunk, remaining)
                .map_err(BridgeError::StreamRead)?
            {
                None => return Ok(TimedLine::Idle),
                Some(0) => {
                    self.mark_eof();
                    return Ok(TimedLine::Eof);
                }
                Some(n) => {
                    self.absorb(&chunk[..n]);
                    if let Some(line) = self.next_line() {
                        return Ok(TimedLine::Line(line));
                    }
                    if remaining.is_zero() {
                        return Ok(TimedLine::Idle);
                    }
                }
            }
        }
    }

    fn absorb(&mut self, data: &[u8]) {
        trace!("RAW {} bytes: {}", data.len(), hex_snippet(data, 64));
        metrics::add_bytes_read(data.len());
        self.buf.extend_from_slice(data);
    }

    fn mark_eof(&mut self) {
        self.eof = true;
        if !self.buf.is_empty() {
            debug!(
                "end of stream with {} unterminated bytes: {}",
                self.buf.len(),
                escape_bytes(&self.buf)
            );
        }
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        let idx = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf.split_to(idx + 1).to_vec();
        metrics::inc_lines_framed();
        trace!("line: {}", escape_bytes(&line));
        Some(line)
    }
}
