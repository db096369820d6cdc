//! usb-widget host
//!
//! Sends one framed command to the widget over its bulk endpoints and prints
//! the response. The heavy lifting lives in the library: a supervisor-owned
//! worker thread services transfers while this thread blocks for the result.

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use host::config::HostConfig;
use host::logging::setup_logging;
use host::usb::{EventLoopSupervisor, UsbDeviceIo};
use rusb::{Context, UsbContext};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "usb-widget")]
#[command(
    author,
    version,
    about = "Exchange framed commands with the USB widget"
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Command identifier, hex or decimal (e.g. 0x80 for echo)
    #[arg(long, default_value = "0x80")]
    command: String,

    /// Request payload as hex bytes (e.g. 010203)
    #[arg(long, default_value = "010203")]
    payload: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = HostConfig::default();
        let path = HostConfig::default_path();
        config.save(&path).context("failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        HostConfig::load(Some(path.clone())).context("failed to load configuration")?
    } else {
        HostConfig::load_or_default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    setup_logging(log_level).context("failed to setup logging")?;

    info!("usb-widget v{}", env!("CARGO_PKG_VERSION"));

    let command = parse_u16(&args.command)
        .map_err(|e| anyhow!("invalid --command '{}': {}", args.command, e))?;
    let payload = parse_hex(&args.payload)
        .map_err(|e| anyhow!("invalid --payload '{}': {}", args.payload, e))?;

    let context = Context::new().context("failed to initialise USB context")?;
    let io = UsbDeviceIo::open(&context, &config.device).context("failed to open widget")?;

    let supervisor = Arc::new(EventLoopSupervisor::new());
    let session = supervisor
        .open(Arc::new(io))
        .context("failed to start transfer worker")?;

    let engine = session.engine(config.transfer.timeout(), config.transfer.read_buffer);
    engine
        .send_request(command, &payload)
        .context("failed to submit request")?;

    let result = engine.wait().context("failed to collect response")?;
    if result.is_success() {
        info!(
            "received {} bytes in {:?}: {}",
            result.data.len(),
            result.elapsed,
            hex_dump(&result.data)
        );
    } else {
        warn!(
            "exchange failed during {:?} transfer after {:?}: {}",
            result.stage, result.elapsed, result.status
        );
    }

    session.close();
    Ok(())
}

/// Parse a u16 from decimal or 0x-prefixed hex
fn parse_u16(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| e.to_string())
}

/// Parse an even-length hex string into bytes; empty input is an empty payload
fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

/// Space-separated hex rendering of received bytes
fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
