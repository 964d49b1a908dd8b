//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// BLE pinpad engine host
#[derive(Debug, Parser)]
#[command(name = "pinpad")]
#[command(about = "Run the pinpad engine or compute the PIN a client would send")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the engine against a console radio driven from stdin
    ///
    /// Each stdin line is one transport event: `connect`, `disconnect`,
    /// `start`, `stop`, `status`, or `pin <text>`.
    Run {
        /// Path to the pinpad JSON configuration
        #[arg(long)]
        config: PathBuf,

        /// Also write daily-rolling logs into this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Print the one-time PIN for a shared secret
    Code {
        /// OTP flavour configured on the device
        #[arg(long, value_enum)]
        mode: OtpMode,

        /// Shared secret, as configured on the device
        #[arg(long)]
        secret: String,

        /// HOTP counter as published by the device
        #[arg(long, default_value_t = 0)]
        counter: u64,

        /// Unix time for TOTP (defaults to now)
        #[arg(long)]
        time: Option<u64>,
    },
}

/// OTP modes the companion can compute codes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OtpMode {
    Hotp,
    Totp,
}
