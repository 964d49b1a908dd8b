//! The engine wired to the console radio and a file-backed counter.

use std::path::Path;

use pinpad_engine::{
    ChunkSink, Clock, FileCounterStore, PinpadConfig, PinpadSession, SessionState, Validator,
};

use crate::console::ConsoleRadio;
use crate::events::HostEvent;

/// Session type run by the host.
pub type HostSession<C> = PinpadSession<ConsoleRadio, FileCounterStore, C>;

/// Applies [`HostEvent`]s to a running session.
#[derive(Debug)]
pub struct Host<C> {
    session: HostSession<C>,
}

impl<C: Clock> Host<C> {
    /// Build the session for `config`. Without a `counterPath`, the HOTP
    /// counter lives in `default_dir`.
    ///
    /// # Errors
    ///
    /// Fails if the configured secret cannot key a validator.
    pub fn new(
        config: &PinpadConfig,
        default_dir: &Path,
        radio: ConsoleRadio,
        clock: C,
    ) -> anyhow::Result<Self> {
        let validator = Validator::from_config(config)?;
        let store = FileCounterStore::new(config.counter_path_or(default_dir));
        tracing::debug!(path = %store.path().display(), "Counter store");

        let mut session = PinpadSession::new(validator, radio, store, clock);
        session.register_state_listener(|change| match change.to {
            SessionState::Accepted => tracing::info!("PIN accepted"),
            SessionState::Rejected => tracing::warn!("PIN rejected"),
            _ => tracing::debug!(from = %change.from, to = %change.to, "State changed"),
        });
        Ok(Self { session })
    }

    /// Start the service and drive the session until it is up.
    pub fn power_on(&mut self) {
        self.session.start();
        for _ in 0..2 {
            self.session.tick();
            if self.session.is_active() {
                break;
            }
        }
    }

    /// Apply one event.
    pub fn handle(&mut self, event: HostEvent) {
        tracing::debug!(%event, "Console event");
        match event {
            HostEvent::Connect => self.session.on_connected(),
            HostEvent::Disconnect => self.session.on_disconnected(),
            HostEvent::Start => self.session.start(),
            HostEvent::Stop => self.session.stop(),
            HostEvent::Status => self.print_status(),
            HostEvent::Pin(pin) => self.session.on_chunk(&HostEvent::pin_wire_bytes(&pin)),
        }
    }

    /// Run one session step.
    pub fn tick(&mut self) {
        self.session.tick();
    }

    /// Write handle for PIN bytes arriving from another task.
    #[must_use]
    pub fn chunk_sink(&self) -> ChunkSink {
        self.session.chunk_sink()
    }

    /// Borrow the session.
    #[must_use]
    pub const fn session(&self) -> &HostSession<C> {
        &self.session
    }

    fn print_status(&mut self) {
        tracing::debug!(buffered = self.session.buffered_len(), "Status requested");
        match serde_json::to_string(&self.session.published_attributes()) {
            Ok(json) => self.session.transport_mut().print(json),
            Err(e) => tracing::warn!(error = %e, "Could not encode status"),
        }
    }
}
