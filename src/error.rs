use thiserror::Error;

/// Errors raised by the capture pipeline and its device collaborators.
///
/// End-of-stream is not an error; it is reported through the framer's return
/// values. Decoding never fails and has no variant here.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O failure on the byte source. Fatal to the current session.
    #[error("stream read error: {0}")]
    StreamRead(#[source] std::io::Error),

    /// I/O failure while writing or syncing a log record.
    #[error("log write error: {0}")]
    LogWrite(#[source] std::io::Error),

    /// I/O failure while scanning an existing log.
    #[error("log read error: {0}")]
    LogRead(#[source] std::io::Error),

    /// Another listener already holds the log file.
    #[error("log file {path} is locked by another listener")]
    LogLocked { path: String },

    #[cfg(feature = "serial")]
    #[error("serial error on {port}: {source}")]
    Serial {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Failure writing a command to the device.
    #[error("device write error: {0}")]
    DeviceWrite(#[source] std::io::Error),

    #[error("no AT device found; specify --port to override")]
    NoDevice,

    #[error("multiple AT devices found ({0}); please specify --port")]
    AmbiguousDevice(String),

    /// The discovery directory exists but could not be listed.
    #[error("device discovery failed: {0}")]
    Discovery(#[source] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
