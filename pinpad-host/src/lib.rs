//! `pinpad` host: runs the PIN validation engine behind a console radio.
//!
//! `pinpad run` reads transport events from stdin and prints what a GATT
//! client would observe. `pinpad code` computes the PIN a companion client
//! would send.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod cli;
pub mod companion;
pub mod console;
pub mod events;
pub mod host;
pub mod logging;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use pinpad_engine::{ChunkSink, Clock, PinpadConfig, SystemClock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use cli::{Cli, Command};
use console::ConsoleRadio;
use events::HostEvent;
use host::Host;

/// Interval between session ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if logging, the configuration, or stdin fail.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run { config, log_dir } => {
            let _guard = logging::init(log_dir.as_deref())?;
            let parsed = PinpadConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let default_dir = config.parent().unwrap_or_else(|| Path::new("."));

            let mut host = Host::new(
                &parsed,
                default_dir,
                ConsoleRadio::stdout(),
                SystemClock::new(),
            )?;
            host.power_on();
            serve(host, BufReader::new(tokio::io::stdin())).await
        }
        Command::Code {
            mode,
            secret,
            counter,
            time,
        } => {
            let unix_time = time.unwrap_or_else(|| SystemClock::new().unix_time());
            println!("{}", companion::code(mode, secret, counter, unix_time));
            Ok(())
        }
    }
}

/// Drive `host` from `input` until the input ends and the service is down.
///
/// PIN lines go straight into the chunk sink from the reader task; every
/// other event is applied on the tick loop. End of input requests a stop.
///
/// # Errors
///
/// Returns an error if reading `input` fails.
pub async fn serve<C, R>(mut host: Host<C>, input: R) -> anyhow::Result<()>
where
    C: Clock,
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(32);
    let reader = tokio::spawn(read_events(input, host.chunk_sink(), tx));

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut input_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                host.tick();
                if !input_open && !host.session().is_active() {
                    break;
                }
            }
            event = rx.recv(), if input_open => match event {
                Some(event) => host.handle(event),
                None => {
                    tracing::info!("Input closed, stopping");
                    input_open = false;
                    host.handle(HostEvent::Stop);
                }
            },
        }
    }

    reader.await.context("stdin reader task")?
}

async fn read_events<R>(
    input: R,
    sink: ChunkSink,
    tx: mpsc::Sender<HostEvent>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("reading input")? {
        match line.parse::<HostEvent>() {
            Ok(HostEvent::Pin(pin)) => sink.on_chunk(&HostEvent::pin_wire_bytes(&pin)),
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(events::EventParseError::Empty) => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring input line"),
        }
    }
    Ok(())
}
