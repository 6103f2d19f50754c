//! Test utilities & fixtures.
//! Provides a scripted byte source that replays chunks and idle gaps.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use air780e::modem::ByteSource;

/// One step of a script.
#[derive(Debug, Clone)]
pub enum Event {
    /// Bytes returned by a single read.
    Data(Vec<u8>),
    /// A quiet period longer than any settle window.
    Gap,
    /// A failing read.
    #[allow(dead_code)]
    Fail(io::ErrorKind),
}

/// Replays a fixed sequence of reads; end-of-stream once exhausted.
/// A blocking read skips gaps, a bounded read reports them as idle.
pub struct ScriptedSource {
    events: VecDeque<Event>,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// One data event per chunk, no gaps.
    #[allow(dead_code)]
    pub fn chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self::new(chunks.into_iter().map(|c| Event::Data(c.as_ref().to_vec())))
    }

    fn copy_out(&mut self, mut chunk: Vec<u8>, buf: &mut [u8]) -> usize {
        if chunk.len() > buf.len() {
            let rest = chunk.split_off(buf.len());
            self.events.push_front(Event::Data(rest));
        }
        buf[..chunk.len()].copy_from_slice(&chunk);
        chunk.len()
    }
}

impl ByteSource for ScriptedSource {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.events.pop_front() {
                Some(Event::Data(chunk)) => return Ok(self.copy_out(chunk, buf)),
                Some(Event::Gap) => continue,
                Some(Event::Fail(kind)) => return Err(io::Error::new(kind, "scripted failure")),
                None => return Ok(0),
            }
        }
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<Option<usize>> {
        match self.events.pop_front() {
            Some(Event::Data(chunk)) => Ok(Some(self.copy_out(chunk, buf))),
            Some(Event::Gap) => Ok(None),
            Some(Event::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            None => Ok(Some(0)),
        }
    }
}

/// UTF-16BE bytes of `s` as uppercase hex, the way the modem reports them.
#[allow(dead_code)]
pub fn utf16_hex(s: &str) -> String {
    let bytes: Vec<u8> = s.encode_utf16().flat_map(u16::to_be_bytes).collect();
    hex::encode_upper(bytes)
}
