//! # Listening Sessions
//!
//! A *session* is one blocking pass over a byte source: frame lines, assemble
//! messages, append each to the log, stop at end-of-stream or on the first
//! I/O error. Both handles are owned by the session and released on every
//! exit path.
//!
//! The *supervisor* ([`Listener`], serial feature) keeps sessions running:
//!
//! ```text
//! loop {
//!     choose port ──none──► wait poll_interval, rescan
//!     initialize port
//!     wait post_init_delay
//!     run session ──error──► wait restart_delay
//! }
//! ```
//!
//! Retry lives here, never inside the session.
use log::info;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::modem::{ByteSource, LineFramer, MessageAssembler};
use crate::storage::MessageLog;

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub messages: usize,
}

/// Capture from `source` into the log at `log_path` until end-of-stream.
pub fn run_session<S: ByteSource>(
    source: S,
    log_path: impl AsRef<Path>,
    settle_window: Duration,
) -> Result<SessionSummary> {
    let mut log = MessageLog::open(log_path)?;
    info!(
        "capturing to {} (settle window {} ms)",
        log.path().display(),
        settle_window.as_millis()
    );
    let mut assembler = MessageAssembler::new(LineFramer::new(source), settle_window);
    let messages = assembler.run(&mut log)?;
    info!("stream ended after {} messages", messages);
    Ok(SessionSummary { messages })
}

#[cfg(feature = "serial")]
pub use self::supervisor::{Listener, Shutdown};

#[cfg(feature = "serial")]
mod supervisor {
    use super::*;
    use log::{error, warn};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;
    use tokio::time::sleep;

    use crate::config::Config;
    use crate::metrics;
    use crate::modem::commands::initialize_port;
    use crate::modem::discovery::choose_port;
    use crate::modem::serial::SerialSource;

    /// Cooperative stop signal shared between Ctrl+C handling, the
    /// supervisor's waits and the serial source of the running session.
    #[derive(Debug, Default)]
    pub struct Shutdown {
        flag: Arc<AtomicBool>,
        notify: Notify,
    }

    impl Shutdown {
        pub fn trigger(&self) {
            self.flag.store(true, Ordering::SeqCst);
            self.notify.notify_waiters();
        }

        pub fn is_triggered(&self) -> bool {
            self.flag.load(Ordering::SeqCst)
        }

        fn flag(&self) -> Arc<AtomicBool> {
            self.flag.clone()
        }

        /// Sleep for `duration` unless shutdown comes first. Returns true when
        /// shutdown was requested.
        async fn pause(&self, duration: Duration) -> bool {
            let notified = self.notify.notified();
            if self.is_triggered() {
                return true;
            }
            tokio::select! {
                _ = sleep(duration) => self.is_triggered(),
                _ = notified => true,
            }
        }
    }

    pub struct Listener {
        config: Config,
        port_override: Option<String>,
        shutdown: Arc<Shutdown>,
    }

    impl Listener {
        pub fn new(config: Config, port_override: Option<String>) -> Self {
            Self {
                config,
                port_override,
                shutdown: Arc::new(Shutdown::default()),
            }
        }

        pub fn shutdown_handle(&self) -> Arc<Shutdown> {
            self.shutdown.clone()
        }

        fn explicit_port(&self) -> Option<&str> {
            self.port_override
                .as_deref()
                .or_else(|| self.config.device.explicit_port())
        }

        /// Supervise sessions until shutdown is triggered.
        pub async fn run(&self) -> anyhow::Result<()> {
            let device = &self.config.device;
            let listener = &self.config.listener;
            while !self.shutdown.is_triggered() {
                let port = match choose_port(self.explicit_port(), device) {
                    Ok(port) => port,
                    Err(e) => {
                        warn!("{}", e);
                        if self.shutdown.pause(listener.poll_interval()).await {
                            break;
                        }
                        continue;
                    }
                };
                info!("Using port {}", port);

                if let Err(e) =
                    initialize_port(&port, device.baud_rate, device.init_interval()).await
                {
                    warn!("init commands failed ({}); retrying after delay", e);
                    if self.shutdown.pause(listener.poll_interval()).await {
                        break;
                    }
                    continue;
                }
                if self.shutdown.pause(listener.post_init_delay()).await {
                    break;
                }

                metrics::inc_sessions_started();
                let outcome = self.spawn_session(port.clone()).await;
                info!("session stats: {}", metrics::snapshot());
                match outcome {
                    Ok(summary) => info!(
                        "session on {} ended cleanly ({} messages); rescanning",
                        port, summary.messages
                    ),
                    Err(e) => {
                        metrics::inc_sessions_failed();
                        error!("listener error on {} ({}); restarting scan", port, e);
                        if self.shutdown.pause(listener.restart_delay()).await {
                            break;
                        }
                    }
                }
            }
            info!("Stopped listening.");
            Ok(())
        }

        async fn spawn_session(&self, port: String) -> anyhow::Result<SessionSummary> {
            let baud = self.config.device.baud_rate;
            let logfile = self.config.listener.logfile.clone();
            let window = self.config.listener.settle_window();
            let stop = self.shutdown.flag();
            let summary = tokio::task::spawn_blocking(move || {
                let source = SerialSource::open(&port, baud)?.with_stop(stop);
                run_session(source, logfile, window)
            })
            .await??;
            Ok(summary)
        }
    }

}
