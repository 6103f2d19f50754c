//! # Storage Module - Message Log
//!
//! Append-only JSON Lines log of captured messages. Each completed
//! [`LogicalMessage`] becomes one [`LogRecord`] on its own line:
//!
//! ```text
//! {"timestamp_local":"2025-11-02 08:14:03.120","timestamp":1762042443120,"message_hex":"2b43..."}
//! ```
//!
//! ## Guarantees
//!
//! - **Durable appends**: every record is written with one write call, then
//!   flushed and synced before [`MessageLog::append`] returns. Nothing is held
//!   in memory between calls.
//! - **Append only**: the file is opened in append mode; existing records are
//!   never rewritten, truncated or reordered.
//! - **Single writer**: an exclusive advisory lock is held while the log is
//!   open, so a second listener on the same file fails fast.
//! - **Lossless payload**: raw bytes are stored as lowercase hex.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use air780e::storage::{MessageLog, read_records};
//!
//! # fn main() -> air780e::error::Result<()> {
//! let mut log = MessageLog::open("messages.jsonl")?;
//! log.append_bytes(b"+CIEV: \"MESSAGE\",1\r\n")?;
//! drop(log);
//!
//! for record in read_records("messages.jsonl")? {
//!     println!("{} {}", record.timestamp_local, record.decoded());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Reading is a linear scan; there is no index and no compaction.

use chrono::{DateTime, Local, TimeZone};
use fs2::FileExt;
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::decoder;
use crate::error::{BridgeError, Result};
use crate::logutil::escape_log;
use crate::metrics;
use crate::modem::{LogicalMessage, MessageSink};

/// Local rendering of a record's instant, millisecond precision.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp_local: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Raw message bytes, lowercase hex.
    pub message_hex: String,
}

impl LogRecord {
    pub fn new(at: DateTime<Local>, payload: &[u8]) -> Self {
        Self {
            timestamp_local: at.format(LOCAL_TIME_FORMAT).to_string(),
            timestamp: at.timestamp_millis(),
            message_hex: hex::encode(payload),
        }
    }

    /// Raw payload bytes, or `None` if the stored hex is corrupt.
    pub fn payload(&self) -> Option<Vec<u8>> {
        hex::decode(&self.message_hex).ok()
    }

    /// Human-readable text recovered by the default decoder.
    pub fn decoded(&self) -> String {
        decoder::decode_payload_hex(&self.message_hex)
    }
}

/// Writer half of the message log.
pub struct MessageLog {
    path: PathBuf,
    file: File,
    last_timestamp: i64,
}

impl MessageLog {
    /// Open (or create) the log for appending and take the writer lock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(BridgeError::LogWrite)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(BridgeError::LogLocked {
                    path: path.display().to_string(),
                });
            }
            return Err(BridgeError::LogWrite(e));
        }

        // A torn tail (crash mid-write elsewhere) must not swallow our first record.
        if ends_without_newline(&mut file).map_err(BridgeError::LogWrite)? {
            warn!(
                "{} does not end with a newline; starting new records on a fresh line",
                path.display()
            );
            file.write_all(b"\n").map_err(BridgeError::LogWrite)?;
            file.sync_data().map_err(BridgeError::LogWrite)?;
        }

        Ok(Self {
            path,
            file,
            last_timestamp: i64::MIN,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, message: &LogicalMessage) -> Result<LogRecord> {
        self.append_bytes(message.as_bytes())
    }

    /// Persist one payload as one record. Returns once the record is synced.
    pub fn append_bytes(&mut self, payload: &[u8]) -> Result<LogRecord> {
        let record = LogRecord::new(self.next_instant(), payload);
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .map_err(BridgeError::LogWrite)?;
        self.file.flush().map_err(BridgeError::LogWrite)?;
        self.file.sync_data().map_err(BridgeError::LogWrite)?;

        self.last_timestamp = record.timestamp;
        metrics::inc_messages_logged();
        Ok(record)
    }

    /// Wall clock, clamped so records never go back in time within one writer.
    fn next_instant(&self) -> DateTime<Local> {
        let now = Local::now();
        if now.timestamp_millis() >= self.last_timestamp {
            return now;
        }
        Local
            .timestamp_millis_opt(self.last_timestamp)
            .single()
            .unwrap_or(now)
    }
}

impl MessageSink for MessageLog {
    fn deliver(&mut self, message: LogicalMessage) -> Result<()> {
        let record = self.append(&message)?;
        let decoded = decoder::inspect_bytes(message.as_bytes());
        if decoded.is_fallback() {
            metrics::inc_decode_fallbacks();
        }
        info!(
            "logged message ({} lines, {} bytes) at {}: {}",
            message.line_count(),
            message.len(),
            record.timestamp_local,
            escape_log(&decoded.text)
        );
        Ok(())
    }
}

fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Scan the whole log in order. Lines that are not valid records are skipped.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<LogRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(BridgeError::LogRead)?;
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut raw = Vec::new();
    let mut line_no = 0usize;
    loop {
        raw.clear();
        let n = reader
            .read_until(b'\n', &mut raw)
            .map_err(BridgeError::LogRead)?;
        if n == 0 {
            break;
        }
        line_no += 1;
        let text = String::from_utf8_lossy(&raw);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match serde_json::from_str::<LogRecord>(text) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                "{}:{}: skipping malformed record: {}",
                path.display(),
                line_no,
                e
            ),
        }
    }
    Ok(records)
}

/// Decoded text of the newest records whose decoding matches `pattern`,
/// newest first, at most `count`.
pub fn recent(path: impl AsRef<Path>, count: usize, pattern: &Regex) -> Result<Vec<String>> {
    let records = read_records(path)?;
    Ok(records
        .iter()
        .rev()
        .map(LogRecord::decoded)
        .filter(|text| pattern.is_match(text))
        .take(count)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_hex_is_lowercase_and_lossless() {
        let payload = b"\x00\xffAT\r\n";
        let record = LogRecord::new(Local::now(), payload);
        assert_eq!(record.message_hex, "00ff41540d0a");
        assert_eq!(record.payload().unwrap(), payload.to_vec());
    }

    #[test]
    fn local_timestamp_has_millisecond_precision() {
        let at = Local.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        let record = LogRecord::new(at, b"OK\r\n");
        assert_eq!(record.timestamp, 1_700_000_000_123);
        assert!(record.timestamp_local.ends_with(".123"), "{}", record.timestamp_local);
    }

    #[test]
    fn record_serializes_required_keys() {
        let record = LogRecord::new(Local::now(), b"RING\r\n");
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert!(value["timestamp"].is_i64());
        assert!(value["timestamp_local"].is_string());
        assert_eq!(value["message_hex"], "52494e470d0a");
    }

    #[test]
    fn second_writer_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        let _first = MessageLog::open(&path).unwrap();
        match MessageLog::open(&path) {
            Err(BridgeError::LogLocked { .. }) => {}
            other => panic!("expected LogLocked, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn timestamps_never_decrease() {
        let dir = tempdir().unwrap();
        let mut log = MessageLog::open(dir.path().join("m.jsonl")).unwrap();
        let mut last = i64::MIN;
        for _ in 0..20 {
            let r = log.append_bytes(b"OK\r\n").unwrap();
            assert!(r.timestamp >= last);
            last = r.timestamp;
        }
    }

    #[test]
    fn undecodable_cmt_counts_as_fallback_when_logged() {
        use crate::modem::{LineFramer, MessageAssembler, ReaderSource};
        use std::io::Cursor;
        use std::time::Duration;

        let dir = tempdir().unwrap();
        let mut log = MessageLog::open(dir.path().join("m.jsonl")).unwrap();
        let before = metrics::snapshot().decode_fallbacks;
        let source = ReaderSource::new(Cursor::new(b"+CMT: \"0A1\",25\r\n0041\r\n".to_vec()));
        let delivered = MessageAssembler::new(LineFramer::new(source), Duration::from_millis(10))
            .run(&mut log)
            .unwrap();
        assert_eq!(delivered, 1);
        assert!(metrics::snapshot().decode_fallbacks > before);
    }

    #[test]
    fn corrupt_hex_decodes_to_empty_view() {
        let record = LogRecord {
            timestamp_local: String::new(),
            timestamp: 0,
            message_hex: "zz".to_string(),
        };
        assert_eq!(record.payload(), None);
        assert_eq!(record.decoded(), "");
    }
}
