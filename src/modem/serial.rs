//! Serial-port byte source.
//!
//! `serialport` reads always carry a timeout; a blocking read is a loop of
//! short polls. Between polls the source checks an optional stop flag and
//! reports end-of-stream once it is set, which lets a supervisor end a session
//! at a read boundary instead of in the middle of a log write.
use log::debug;
use serialport::SerialPort;
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::ByteSource;
use crate::error::{BridgeError, Result};

/// Poll granularity of a blocking read.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Open a serial port with 8N1 framing.
pub fn open_port(
    port_name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>> {
    let mut builder = serialport::new(port_name, baud_rate).timeout(timeout);
    // Some USB serial adapters need explicit settings
    #[cfg(unix)]
    {
        builder = builder
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None);
    }
    builder.open().map_err(|source| BridgeError::Serial {
        port: port_name.to_string(),
        source,
    })
}

pub struct SerialSource {
    port: Box<dyn SerialPort>,
    stop: Option<Arc<AtomicBool>>,
}

impl SerialSource {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = open_port(port_name, baud_rate, POLL_INTERVAL)?;
        debug!("opened {} at {} baud for listening", port_name, baud_rate);
        Ok(Self::from_port(port))
    }

    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port, stop: None }
    }

    /// Report end-of-stream once `flag` is set.
    pub fn with_stop(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.port.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl ByteSource for SerialSource {
    fn read_blocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.stopped() {
                return Ok(0);
            }
            if let Some(n) = self.read_within(buf, POLL_INTERVAL)? {
                return Ok(n);
            }
        }
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        if self.stopped() {
            return Ok(Some(0));
        }
        self.read_within(buf, timeout)
    }
}
