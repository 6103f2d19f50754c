//! A full capture session from byte source to log file.

mod common;

use air780e::error::BridgeError;
use air780e::listener::run_session;
use air780e::modem::ReaderSource;
use air780e::storage::read_records;
use common::{utf16_hex, Event, ScriptedSource};
use std::io::{self, Cursor};
use std::time::Duration;
use tempfile::tempdir;

const WINDOW: Duration = Duration::from_millis(100);

#[test]
fn bursts_become_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("messages.jsonl");
    let cmt = format!("+CMT: \"{}\",25\r\n", utf16_hex("10086"));
    let body = format!("{}\r\n", utf16_hex("余额不足"));
    let source = ScriptedSource::new(vec![
        Event::Data(b"\r\n".to_vec()),
        Event::Data(cmt.as_bytes()[..7].to_vec()),
        Event::Data(cmt.as_bytes()[7..].to_vec()),
        Event::Data(body.clone().into_bytes()),
        Event::Gap,
        Event::Data(b"+CMTI: \"SM\",4\r\n".to_vec()),
    ]);

    let summary = run_session(source, &path, WINDOW).unwrap();
    assert_eq!(summary.messages, 2);

    let records = read_records(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].decoded(), "\r\n+CMT: \"10086\",25\r\n余额不足\r\n");
    assert_eq!(records[1].payload().unwrap(), b"+CMTI: \"SM\",4\r\n");
    assert!(records[0].timestamp <= records[1].timestamp);
}

#[test]
fn session_error_keeps_what_was_captured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("messages.jsonl");
    let source = ScriptedSource::new(vec![
        Event::Data(b"RING\r\n".to_vec()),
        Event::Gap,
        Event::Data(b"+CLIP: \"10086\",129\r\n".to_vec()),
        Event::Fail(io::ErrorKind::BrokenPipe),
    ]);

    let err = run_session(source, &path, WINDOW).unwrap_err();
    assert!(matches!(err, BridgeError::StreamRead(_)));
    let payloads: Vec<Vec<u8>> = read_records(&path)
        .unwrap()
        .iter()
        .filter_map(|r| r.payload())
        .collect();
    assert_eq!(payloads, vec![b"RING\r\n".to_vec(), b"+CLIP: \"10086\",129\r\n".to_vec()]);
}

#[test]
fn replaying_a_capture_file_appends_to_existing_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("messages.jsonl");
    run_session(ReaderSource::new(Cursor::new(b"OK\r\n".to_vec())), &path, WINDOW).unwrap();
    run_session(ReaderSource::new(Cursor::new(b"ERROR\r\n".to_vec())), &path, WINDOW).unwrap();
    let records = read_records(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].payload().unwrap(), b"ERROR\r\n");
}

#[test]
fn locked_log_fails_before_reading() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("messages.jsonl");
    let _held = air780e::storage::MessageLog::open(&path).unwrap();
    let source = ReaderSource::new(Cursor::new(b"OK\r\n".to_vec()));
    let err = run_session(source, &path, WINDOW).unwrap_err();
    assert!(matches!(err, BridgeError::LogLocked { .. }));
}
