//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// Fetch an OAuth2 client-credentials token through the circuit breaker
#[derive(Parser, Debug)]
#[command(name = "token-courier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "TOKEN_COURIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "TOKEN_COURIER_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "TOKEN_COURIER_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Print the full token response as JSON instead of the bare value
    #[arg(long)]
    pub json: bool,
}
