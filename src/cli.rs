//! Command line interface for the `bearerbox` binary.
//!
//! Sends one sms through the gateway and prints the ack.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `bearerbox` binary.
#[derive(Debug, Parser)]
#[command(
    name = "bearerbox",
    version,
    about = "Send an sms through a bearerbox gateway"
)]
pub struct Cli {
    /// TOML file with session settings.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Gateway host, overriding the configuration file.
    #[arg(long)]
    pub host: Option<String>,
    /// Gateway port, overriding the configuration file.
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Id to identify with, overriding the configuration file.
    #[arg(long)]
    pub client_id: Option<String>,
    /// Sender address.
    #[arg(long)]
    pub from: String,
    /// Receiver address.
    #[arg(long)]
    pub to: String,
    /// Message text.
    pub text: String,
    /// Seconds to wait for the gateway's ack.
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,
    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
