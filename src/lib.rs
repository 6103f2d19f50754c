//! # air780e - SMS capture for AIR780E-class cellular modems
//!
//! The modem's AT port emits unsolicited notifications (`+CMT:`, `+CMTI:`,
//! `RING`, ...) as CRLF-terminated lines, sometimes split across reads and
//! sometimes spanning several lines. This crate turns that byte stream into a
//! durable, append-only log of *logical messages* and can render stored
//! `+CMT:` payloads back into readable text.
//!
//! ## Features
//!
//! - **Line framing** over any [`modem::ByteSource`], with a bounded-wait read
//!   that separates "idle" from "end of stream".
//! - **Settle-window assembly**: lines arriving within a short quiet period are
//!   grouped into one message.
//! - **JSONL log** with one record per message, raw bytes kept losslessly as hex,
//!   flushed and synced per record, guarded by an exclusive file lock.
//! - **Content decoding** of UTF-16BE hex `+CMT:` senders and bodies.
//! - **Serial plumbing** (feature `serial`): AT-port discovery, modem
//!   initialization, SMS sending and a self-restarting listener.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use air780e::config::Config;
//! use air780e::listener::Listener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let listener = Listener::new(config, None);
//!     listener.run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`modem`] - byte sources, line framer, message assembler, AT commands, discovery
//! - [`storage`] - the JSONL message log
//! - [`decoder`] - display decoding of stored payloads
//! - [`listener`] - listening sessions and the restart supervisor
//! - [`config`] - configuration file handling
//! - [`service`] - systemd unit generation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ByteSource    │ ← serial port, reader, channel
//! └─────────────────┘
//!          │ bytes
//! ┌─────────────────┐
//! │   LineFramer    │ ← CRLF lines, idle / EOF
//! └─────────────────┘
//!          │ lines
//! ┌─────────────────┐
//! │ MessageAssembler│ ← settle window
//! └─────────────────┘
//!          │ messages
//! ┌─────────────────┐
//! │   MessageLog    │ ← JSONL, hex payloads
//! └─────────────────┘
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod listener;
pub mod logutil;
pub mod metrics;
pub mod modem;
pub mod service;
pub mod storage;
