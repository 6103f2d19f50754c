//! Settle-window message assembler.
//!
//! Groups a burst of lines into one [`LogicalMessage`]. The grouping rule is a
//! single idle timeout: once a first line arrives, every further line that
//! completes within `settle_window` of the previous one joins the message. The
//! window restarts after each line, so it bounds the gap between lines, not the
//! total length of a message.
//!
//! ```text
//!  WaitFirstLine ──line──► CollectWithinWindow ──line──┐
//!        ▲                   │       ▲                 │
//!        │                   │       └─────────────────┘
//!        └──idle (deliver)───┘
//! ```
//!
//! End-of-stream while waiting ends the run; end-of-stream while collecting
//! delivers the message first.
use log::{debug, warn};
use std::time::Duration;

use super::framer::{LineFramer, TimedLine};
use super::ByteSource;
use crate::error::Result;

/// Default idle gap that ends a burst.
pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(100);

/// One burst of lines: the raw bytes of every line in arrival order,
/// terminators included. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalMessage {
    bytes: Vec<u8>,
    lines: usize,
}

impl LogicalMessage {
    fn from_first_line(line: Vec<u8>) -> Self {
        Self { bytes: line, lines: 1 }
    }

    fn push_line(&mut self, line: &[u8]) {
        self.bytes.extend_from_slice(line);
        self.lines += 1;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Receives each completed message. Implemented by the message log; a
/// `Vec` collects messages in memory.
pub trait MessageSink {
    fn deliver(&mut self, message: LogicalMessage) -> Result<()>;
}

impl MessageSink for Vec<LogicalMessage> {
    fn deliver(&mut self, message: LogicalMessage) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerState {
    WaitFirstLine,
    CollectWithinWindow(LogicalMessage),
}

/// Result of a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A line was consumed; the machine is collecting.
    Continue,
    /// A message was handed to the sink.
    Delivered,
    /// The stream ended while waiting for a first line.
    Finished,
}

pub struct MessageAssembler<S> {
    framer: LineFramer<S>,
    settle_window: Duration,
    state: AssemblerState,
}

impl<S: ByteSource> MessageAssembler<S> {
    pub fn new(framer: LineFramer<S>, settle_window: Duration) -> Self {
        Self {
            framer,
            settle_window,
            state: AssemblerState::WaitFirstLine,
        }
    }

    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    pub fn settle_window(&self) -> Duration {
        self.settle_window
    }

    pub fn into_framer(self) -> LineFramer<S> {
        self.framer
    }

    /// Run one transition.
    pub fn step<K: MessageSink + ?Sized>(&mut self, sink: &mut K) -> Result<Step> {
        match std::mem::replace(&mut self.state, AssemblerState::WaitFirstLine) {
            AssemblerState::WaitFirstLine => match self.framer.read_line_blocking()? {
                None => Ok(Step::Finished),
                Some(line) => {
                    self.state =
                        AssemblerState::CollectWithinWindow(LogicalMessage::from_first_line(line));
                    Ok(Step::Continue)
                }
            },
            AssemblerState::CollectWithinWindow(mut message) => {
                match self.framer.read_line_with_timeout(self.settle_window) {
                    Ok(TimedLine::Line(line)) => {
                        message.push_line(&line);
                        self.state = AssemblerState::CollectWithinWindow(message);
                        Ok(Step::Continue)
                    }
                    Ok(TimedLine::Idle) | Ok(TimedLine::Eof) => {
                        debug!(
                            "message complete: {} lines, {} bytes",
                            message.line_count(),
                            message.len()
                        );
                        sink.deliver(message)?;
                        Ok(Step::Delivered)
                    }
                    Err(read_err) => {
                        // Lines already framed are complete; keep them before giving up.
                        if let Err(write_err) = sink.deliver(message) {
                            warn!("dropping partial message after read error: {}", write_err);
                        }
                        Err(read_err)
                    }
                }
            }
        }
    }

    /// Run until the stream ends. Returns the number of messages delivered.
    pub fn run<K: MessageSink + ?Sized>(&mut self, sink: &mut K) -> Result<usize> {
        let mut delivered = 0usize;
        loop {
            match self.step(sink)? {
                Step::Continue => {}
                Step::Delivered => delivered += 1,
                Step::Finished => return Ok(delivered),
            }
        }
    }
}
