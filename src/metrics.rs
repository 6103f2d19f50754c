//! Process-wide capture counters.
//! Cheap relaxed atomics; a snapshot is logged when a listening session ends.
use std::sync::atomic::{AtomicU64, Ordering};

static BYTES_READ: AtomicU64 = AtomicU64::new(0);
static LINES_FRAMED: AtomicU64 = AtomicU64::new(0);
static MESSAGES_LOGGED: AtomicU64 = AtomicU64::new(0);
static DECODE_FALLBACKS: AtomicU64 = AtomicU64::new(0);
static SESSIONS_STARTED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_FAILED: AtomicU64 = AtomicU64::new(0);

pub fn add_bytes_read(n: usize) {
    BYTES_READ.fetch_add(n as u64, Ordering::Relaxed);
}

pub fn inc_lines_framed() {
    LINES_FRAMED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_messages_logged() {
    MESSAGES_LOGGED.fetch_add(1, Ordering::Relaxed);
}

/// A logged message was claimed by a recognizer but shown unchanged.
pub fn inc_decode_fallbacks() {
    DECODE_FALLBACKS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_sessions_started() {
    SESSIONS_STARTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_sessions_failed() {
    SESSIONS_FAILED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub bytes_read: u64,
    pub lines_framed: u64,
    pub messages_logged: u64,
    pub decode_fallbacks: u64,
    pub sessions_started: u64,
    pub sessions_failed: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        bytes_read: BYTES_READ.load(Ordering::Relaxed),
        lines_framed: LINES_FRAMED.load(Ordering::Relaxed),
        messages_logged: MESSAGES_LOGGED.load(Ordering::Relaxed),
        decode_fallbacks: DECODE_FALLBACKS.load(Ordering::Relaxed),
        sessions_started: SESSIONS_STARTED.load(Ordering::Relaxed),
        sessions_failed: SESSIONS_FAILED.load(Ordering::Relaxed),
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bytes_read={} lines={} messages={} decode_fallbacks={} sessions={} failed={}",
            self.bytes_read,
            self.lines_framed,
            self.messages_logged,
            self.decode_fallbacks,
            self.sessions_started,
            self.sessions_failed
        )
    }
}
