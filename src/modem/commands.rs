//! Outbound AT traffic: the one-time initialization sequence and SMS sending.
//!
//! Both are fire-and-forget writes. Replies (`OK`, the `>` prompt) are not
//! read back; any reply ends up in the message log when a listener is running.
use log::{debug, info, warn};
use std::io::Write;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{BridgeError, Result};

/// Commands sent once before listening.
pub const INITIAL_COMMANDS: &[&str] = &[
    "AT+CMGF=1",          // SMS text mode
    "AT+CSMP=17,167,0,8", // dcs=8: UCS2 (UTF-16BE) payloads
    "AT+CSCS=IRA",        // IRA character set
    "AT+RNDISCALL=0",     // disable the network adapter
    "AT&W",               // persist settings
];

/// Ctrl+Z, terminates an `AT+CMGS` body.
pub const CTRL_Z: u8 = 0x1A;

/// Commands and phone numbers must be plain ASCII on the wire.
fn ascii_or_placeholder(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect()
}

/// Write each command followed by CRLF, pausing `interval` after each one.
/// Individual write failures are logged and skipped. Returns how many
/// commands were written.
pub async fn send_initial_commands<W, I, C>(
    writer: &mut W,
    commands: I,
    interval: Duration,
) -> usize
where
    W: Write,
    I: IntoIterator<Item = C>,
    C: AsRef<str>,
{
    let mut written = 0usize;
    for cmd in commands {
        let cmd = cmd.as_ref();
        let payload = format!("{}\r\n", ascii_or_placeholder(cmd));
        match writer.write_all(payload.as_bytes()).and_then(|_| writer.flush()) {
            Ok(()) => {
                debug!("sent {}", cmd);
                written += 1;
            }
            Err(e) => warn!("init command {} failed: {}", cmd, e),
        }
        sleep(interval).await;
    }
    written
}

/// The `AT+CMGS` header line for `phone`.
pub fn sms_header(phone: &str) -> String {
    format!("AT+CMGS=\"{}\"\r\n", ascii_or_placeholder(phone))
}

/// UTF-16BE bytes of `text`, matching `AT+CSMP=...,8`.
pub fn encode_utf16be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Send one SMS: header, wait `delay` for the prompt, body, Ctrl+Z.
pub async fn send_sms<W: Write>(
    writer: &mut W,
    phone: &str,
    message: &str,
    delay: Duration,
) -> Result<()> {
    writer
        .write_all(sms_header(phone).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(BridgeError::DeviceWrite)?;

    sleep(delay).await;

    let mut body = encode_utf16be(message);
    body.push(CTRL_Z);
    writer
        .write_all(&body)
        .and_then(|_| writer.flush())
        .map_err(BridgeError::DeviceWrite)?;
    info!("SMS to {} submitted ({} chars)", phone, message.chars().count());
    Ok(())
}

#[cfg(feature = "serial")]
pub use self::serial_ops::{initialize_port, send_sms_on_port};

#[cfg(feature = "serial")]
mod serial_ops {
    use super::*;
    use crate::modem::serial::open_port;

    /// Open `port_name` and run the initialization sequence on it. Failure to
    /// open is returned to the caller.
    pub async fn initialize_port(
        port_name: &str,
        baud_rate: u32,
        interval: Duration,
    ) -> Result<usize> {
        let mut port = open_port(port_name, baud_rate, Duration::from_millis(500))?;
        info!("Initializing modem on {}", port_name);
        Ok(send_initial_commands(&mut port, INITIAL_COMMANDS, interval).await)
    }

    pub async fn send_sms_on_port(
        port_name: &str,
        baud_rate: u32,
        phone: &str,
        message: &str,
        delay: Duration,
    ) -> Result<()> {
        let mut port = open_port(port_name, baud_rate, Duration::from_millis(500))?;
        send_sms(&mut port, phone, message, delay).await
    }
}
