use std::path::PathBuf;

use clap::Parser;

/// Print the default output device's mix format whenever it changes.
#[derive(Debug, Parser)]
#[command(name = "mix-watch")]
#[command(version)]
pub struct Args {
    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Print the current format once and exit
    #[arg(long)]
    pub once: bool,

    /// Include the endpoint id on each line; a device switch counts as a change
    #[arg(long)]
    pub show_device: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
