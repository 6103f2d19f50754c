//! Binary entrypoint for the air780e CLI.
//!
//! Commands:
//! - `listen [--port <path>]` - capture modem notifications into the JSONL log
//! - `send --phone <n> --message <text>` - send one SMS
//! - `recent [--count N] [--pattern RE]` - print the newest matching messages
//! - `decode <HEX>` - decode a stored `message_hex` payload
//! - `ports` - list discovered AT ports
//! - `init [--port <path>]` - create a starter `config.toml`
//! - `gen-service [--output <path>]` - print or write a systemd unit
//!
//! See the library crate docs for module-level details: `air780e::`.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use regex::Regex;
use std::path::Path;

use air780e::config::Config;
use air780e::decoder::decode_payload_hex;
use air780e::modem::discovery::list_at_devices;
use air780e::service::{ServiceSpec, SERVICE_NAME};
use air780e::storage;

#[derive(Parser)]
#[command(name = "air780e")]
#[command(about = "SMS capture and sending for AIR780E cellular modems")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for notifications and append them to the message log
    Listen {
        /// AT port (e.g., /dev/ttyUSB2); discovered when omitted
        #[arg(short, long)]
        port: Option<String>,
        /// Message log path
        #[arg(short, long)]
        logfile: Option<String>,
        /// Quiet period that ends a message, in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,
        /// Seconds between device scans while no port is found
        #[arg(long)]
        poll_interval: Option<u64>,
    },
    /// Send an SMS
    Send {
        #[arg(long)]
        phone: String,
        #[arg(short, long)]
        message: String,
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Print the most recent messages matching a pattern
    Recent {
        #[arg(short, long)]
        logfile: Option<String>,
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        #[arg(long, default_value = r"\+CMT:")]
        pattern: String,
    },
    /// Decode a stored message_hex payload
    Decode { hex: String },
    /// List discovered AT ports
    Ports,
    /// Write a starter configuration file
    Init {
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Generate a systemd unit for the listener
    GenService {
        /// Output file; `-` prints to stdout
        #[arg(short, long, default_value = "-")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init { .. } => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);
    if pre_config.is_none() && !matches!(cli.command, Commands::Init { .. }) {
        info!("No usable config at {}; using defaults", cli.config);
    }
    let mut config = pre_config.unwrap_or_default();

    match cli.command {
        Commands::Listen {
            port,
            logfile,
            settle_ms,
            poll_interval,
        } => {
            if let Some(logfile) = logfile {
                config.listener.logfile = logfile;
            }
            if let Some(ms) = settle_ms {
                config.listener.settle_window_ms = ms;
            }
            if let Some(secs) = poll_interval {
                config.listener.poll_interval_secs = secs;
            }
            run_listener(config, port).await?;
        }
        Commands::Send {
            phone,
            message,
            port,
        } => {
            send(&config, port, &phone, &message).await?;
        }
        Commands::Recent {
            logfile,
            count,
            pattern,
        } => {
            let path = logfile.unwrap_or_else(|| config.listener.logfile.clone());
            let pattern =
                Regex::new(&pattern).with_context(|| format!("invalid pattern {}", pattern))?;
            let messages = storage::recent(&path, count, &pattern)?;
            if messages.is_empty() {
                println!("No matching messages in {}", path);
            } else {
                println!("{}", messages.join("\n---\n"));
            }
        }
        Commands::Decode { hex } => {
            println!("{}", decode_payload_hex(&hex));
        }
        Commands::Ports => {
            let devices = list_at_devices(&config.device)?;
            if devices.is_empty() {
                println!("No AT ports found under {}", config.device.by_id_dir.display());
            }
            for dev in devices {
                println!("{}", dev.display());
            }
        }
        Commands::Init { port } => {
            if Path::new(&cli.config).exists() {
                warn!("{} already exists; leaving it unchanged", cli.config);
                return Ok(());
            }
            let mut cfg = Config::default();
            if let Some(port) = port {
                cfg.device.port = port;
            }
            cfg.save(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::GenService { output } => {
            let unit = ServiceSpec::from_env(Path::new(&cli.config))?.render();
            if output == "-" {
                print!("{}", unit);
            } else {
                tokio::fs::write(&output, unit).await?;
                info!(
                    "Wrote {}; install with: sudo cp {} /etc/systemd/system/{} \
                     && sudo systemctl enable --now {}",
                    output, output, SERVICE_NAME, SERVICE_NAME
                );
            }
        }
    }

    Ok(())
}

#[cfg(feature = "serial")]
async fn run_listener(config: Config, port: Option<String>) -> Result<()> {
    use air780e::listener::Listener;

    info!("Starting air780e v{}", env!("CARGO_PKG_VERSION"));
    let listener = Listener::new(config, port);
    let shutdown = listener.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            shutdown.trigger();
        }
    });
    listener.run().await
}

#[cfg(feature = "serial")]
async fn send(config: &Config, port: Option<String>, phone: &str, message: &str) -> Result<()> {
    use air780e::modem::commands::send_sms_on_port;
    use air780e::modem::discovery::choose_port;

    let explicit = port.as_deref().or_else(|| config.device.explicit_port());
    let port = choose_port(explicit, &config.device)?;
    send_sms_on_port(
        &port,
        config.device.baud_rate,
        phone,
        message,
        config.device.send_delay(),
    )
    .await?;
    println!("SMS to {} submitted on {}", phone, port);
    Ok(())
}

#[cfg(not(feature = "serial"))]
async fn run_listener(_config: Config, _port: Option<String>) -> Result<()> {
    log::error!("listen requires the 'serial' feature");
    std::process::exit(2);
}

#[cfg(not(feature = "serial"))]
async fn send(_config: &Config, _port: Option<String>, _phone: &str, _message: &str) -> Result<()> {
    log::error!("send requires the 'serial' feature");
    std::process::exit(2);
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Under systemd stdout is not a terminal; skip the console copy there
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
