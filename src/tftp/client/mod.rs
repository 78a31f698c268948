//! TFTP client implementation
//!
//! This module provides TFTP client functionality:
//! - File download (READ/RRQ)
//! - File upload (WRITE/WRQ)
//! - Stop-and-wait transfer with bounded retransmission
//!
//! # Usage Examples
//!
//! ## Download file
//!
//! ```rust,no_run
//! use tftpc::tftp::client::Client;
//! use tftpc::tftp::client::config::ClientConfig;
//! use tftpc::tftp::core::Mode;
//! use std::path::Path;
//!
//! let config = ClientConfig::new("192.168.1.100".to_string(), 69);
//! let client = Client::new(config).unwrap();
//! client.get("remote.txt", Path::new("local.txt"), Mode::Octet).unwrap();
//! ```
//!
//! ## Upload file
//!
//! ```rust,no_run
//! use tftpc::tftp::client::Client;
//! use tftpc::tftp::client::config::ClientConfig;
//! use tftpc::tftp::core::Mode;
//! use std::path::Path;
//!
//! let config = ClientConfig::new("192.168.1.100".to_string(), 69);
//! let client = Client::new(config).unwrap();
//! client.put(Path::new("local.txt"), "remote.txt", Mode::Octet).unwrap();
//! ```
//!
//! # Command Line Usage
//!
//! ```bash
//! # Download file
//! tftpc 192.168.1.100 69 READ remote.txt octet
//!
//! # Upload file
//! tftpc 192.168.1.100 69 WRITE local.txt netascii
//! ```

mod client_impl;
pub mod config;
mod read;
mod session;
mod write;

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub use client_impl::{Client, TransferReport, TransferRequest};
pub use session::TransferSession;

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Server IP address or hostname
    pub host: String,

    /// Server port
    pub port: u16,

    /// READ downloads from the server, WRITE uploads to it
    #[arg(value_name = "READ|WRITE")]
    pub operation: String,

    /// File name, used on the server and locally
    pub filename: String,

    /// Transfer mode
    #[arg(value_name = "netascii|octet")]
    pub mode: String,

    /// Local file path (defaults to FILENAME)
    #[arg(short, long, value_name = "PATH")]
    pub local: Option<PathBuf>,

    /// Per-attempt timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Attempts per round trip before giving up
    #[arg(short, long)]
    pub retries: Option<u32>,
}

/// Run one TFTP transfer with configuration
///
/// Operation and mode are validated before the socket is opened, so an
/// invalid request never puts a packet on the wire.
pub fn run_with_config(
    args: TransferArgs,
    config: Option<&config::ClientConfig>,
    cancel: Arc<AtomicBool>,
) -> Result<TransferReport> {
    let mut request = TransferRequest::parse(&args.operation, &args.filename, &args.mode)?;
    if let Some(local) = args.local {
        request = request.with_local_file(local);
    }

    let client_config = config.cloned().unwrap_or_default();
    let cfg = client_config.merge_cli(args.host, args.port, args.timeout, args.retries);

    let server_display = cfg.server.as_deref().unwrap_or("unknown");
    let port_display = cfg.port.unwrap_or(69);
    log::info!(
        "{} {} ({}) via {}:{}",
        request.operation,
        request.filename,
        request.mode,
        server_display,
        port_display
    );

    let client = Client::new(cfg)?.with_cancel(cancel);
    let report = client.transfer(&request)?;

    log::info!("Transfer completed: {}", report);
    Ok(report)
}
