//! `pinpad` binary entry point.

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pinpad::run(pinpad::cli::Cli::parse()).await
}
