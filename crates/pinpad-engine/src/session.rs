//! Authentication session state machine.
//!
//! ```text
//!            start()            PIN ok            500 ms
//! Stopped ────────────▶ Idle ──────────▶ Accepted ───────▶ Idle
//!                        │    PIN bad             500 ms
//!                        └─────────────▶ Rejected ───────▶ Idle
//!
//! any ── stop() + 1 s grace ──▶ Stopped
//! any ── client disconnect ───▶ Idle (immediately, buffer cleared)
//! ```
//!
//! Everything happens inside [`PinpadSession::tick`]: the host calls it in
//! a loop and nothing in here blocks or spawns. Chunk delivery is the only
//! entry point that may run on another thread, and it goes through the
//! [`ChunkSink`] lock.

use std::fmt;
use std::time::Duration;

use crate::assembler::{ChunkSink, InputAssembler, PinMessage};
use crate::clock::Clock;
use crate::config::SecurityMode;
use crate::counter::{CounterStore, HotpCounter};
use crate::timer::TimerQueue;
use crate::transport::{PublishedAttributes, Transport};
use crate::validator::{Validator, Verdict};

// ── Constants ───────────────────────────────────────────────────────

/// How long `Accepted`/`Rejected` is held before returning to `Idle`.
pub const HOLD_DURATION: Duration = Duration::from_millis(500);

/// Delay between `stop()` and the service actually going down, so an
/// in-flight status notification can still be delivered.
pub const STOP_GRACE: Duration = Duration::from_millis(1_000);

// ── Types ───────────────────────────────────────────────────────────

/// Session state as published on the status characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Service not running.
    Stopped,
    /// Waiting for a PIN.
    Idle,
    /// Last PIN matched; held for [`HOLD_DURATION`].
    Accepted,
    /// Last PIN did not match; held for [`HOLD_DURATION`].
    Rejected,
}

impl SessionState {
    /// Published string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Idle => "idle",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Value written to the status characteristic.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Stopped => 0x00,
            Self::Idle => 0x01,
            Self::Accepted => 0x02,
            Self::Rejected => 0x03,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Verdict> for SessionState {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => Self::Accepted,
            Verdict::Rejected => Self::Rejected,
        }
    }
}

/// A real transition, delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State being left.
    pub from: SessionState,
    /// State being entered.
    pub to: SessionState,
}

/// Callback invoked synchronously on every real transition.
pub type StateListener = Box<dyn FnMut(StateChange) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    StopService,
}

// ── Session ─────────────────────────────────────────────────────────

/// The pinpad engine: assembler, validator, counter and state in one
/// tick-driven object.
pub struct PinpadSession<T, S, C> {
    transport: T,
    clock: C,
    validator: Validator,
    counter: Option<HotpCounter<S>>,
    assembler: InputAssembler,
    timers: TimerQueue<Deferred>,
    listeners: Vec<StateListener>,
    state: SessionState,
    state_entered_at: Duration,
    should_start: bool,
}

impl<T, S, C> PinpadSession<T, S, C>
where
    T: Transport,
    S: CounterStore,
    C: Clock,
{
    /// Assemble a session in `Stopped`. In HOTP mode the counter is loaded
    /// from `store` here; other modes never touch it.
    pub fn new(validator: Validator, transport: T, store: S, clock: C) -> Self {
        let counter = (validator.mode() == SecurityMode::Hotp).then(|| HotpCounter::load(store));
        let state_entered_at = clock.monotonic();
        tracing::info!(
            security_mode = %validator.mode(),
            hotp_counter = ?counter.as_ref().map(HotpCounter::current),
            "Pinpad configured"
        );
        Self {
            transport,
            clock,
            validator,
            counter,
            assembler: InputAssembler::new(),
            timers: TimerQueue::new(),
            listeners: Vec::new(),
            state: SessionState::Stopped,
            state_entered_at,
            should_start: false,
        }
    }

    // ── Transport events ────────────────────────────────────────────

    /// Handle for the transport's write callback.
    #[must_use]
    pub fn chunk_sink(&self) -> ChunkSink {
        self.assembler.sink()
    }

    /// Append received bytes. Never validates.
    pub fn on_chunk(&self, bytes: &[u8]) {
        self.assembler.on_chunk(bytes);
    }

    /// A client connected.
    pub fn on_connected(&mut self) {
        tracing::debug!("Client connected");
    }

    /// A client disconnected: drop partial input and return to `Idle`
    /// without waiting for a held result to expire.
    pub fn on_disconnected(&mut self) {
        tracing::debug!("Client disconnected");
        self.assembler.clear();
        // A disconnect never leaves `Stopped`. Entering `Idle` here would
        // make the next `start()` a no-op and the service could not be
        // brought back up.
        if self.state != SessionState::Stopped {
            let now = self.clock.monotonic();
            self.set_state(SessionState::Idle, now);
        }
    }

    // ── Control ─────────────────────────────────────────────────────

    /// Request the service to start. Ignored unless `Stopped`.
    pub fn start(&mut self) {
        tracing::debug!("start() called");
        if self.state != SessionState::Stopped {
            return;
        }
        tracing::debug!("Setting pinpad to start");
        self.should_start = true;
    }

    /// Stop the service after [`STOP_GRACE`].
    ///
    /// The pending stop is not cancelled by a later [`start`](Self::start):
    /// a start issued during the grace period is ignored (the session is
    /// not yet `Stopped`) and the service still goes down when the timer
    /// fires.
    pub fn stop(&mut self) {
        tracing::debug!("stop() called");
        let deadline = self.clock.monotonic().saturating_add(STOP_GRACE);
        self.timers.schedule(Deferred::StopService, deadline);
    }

    /// Run one scheduling step.
    pub fn tick(&mut self) {
        let now = self.clock.monotonic();

        for deferred in self.timers.take_due(now) {
            match deferred {
                Deferred::StopService => self.finish_stop(now),
            }
        }

        match self.state {
            SessionState::Stopped => {
                self.discard_input();
                self.poll_start(now);
            }
            SessionState::Idle => self.poll_input(now),
            SessionState::Accepted | SessionState::Rejected => self.poll_hold(now),
        }
    }

    /// Register a transition listener. Listeners run in registration order.
    pub fn register_state_listener<F>(&mut self, listener: F)
    where
        F: FnMut(StateChange) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Current state.
    #[must_use]
    pub const fn current_state(&self) -> SessionState {
        self.state
    }

    /// Whether the last PIN is being held as accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.state == SessionState::Accepted
    }

    /// Whether the last PIN is being held as rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state == SessionState::Rejected
    }

    /// Whether the service is up (any state but `Stopped`).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != SessionState::Stopped
    }

    /// Bytes received but not yet framed into a message.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.assembler.buffered_len()
    }

    /// Whether a deferred stop is armed.
    #[must_use]
    pub fn is_stop_pending(&self) -> bool {
        self.timers.is_pending(Deferred::StopService)
    }

    /// Configured security mode.
    #[must_use]
    pub const fn security_mode(&self) -> SecurityMode {
        self.validator.mode()
    }

    /// Cached HOTP counter; `None` outside HOTP mode.
    #[must_use]
    pub fn hotp_counter(&self) -> Option<u32> {
        self.counter.as_ref().map(HotpCounter::current)
    }

    /// Security mode characteristic value.
    #[must_use]
    pub const fn published_security_mode(&self) -> &'static str {
        self.security_mode().as_str()
    }

    /// HOTP counter characteristic value, as decimal text.
    #[must_use]
    pub fn published_hotp_counter(&self) -> Option<String> {
        self.hotp_counter().map(|c| c.to_string())
    }

    /// Values exposed as read-only characteristics.
    #[must_use]
    pub fn published_attributes(&self) -> PublishedAttributes {
        PublishedAttributes {
            state: self.state.as_str(),
            security_mode: self.published_security_mode(),
            hotp_counter: self.published_hotp_counter(),
        }
    }

    /// Borrow the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Internals ───────────────────────────────────────────────────

    fn poll_start(&mut self, now: Duration) {
        if !self.should_start {
            return;
        }
        if self.transport.is_service_running() {
            self.transport.request_advertising_start();
            self.assembler.clear();
            self.set_state(SessionState::Idle, now);
            self.should_start = false;
            tracing::info!("Service started");
        } else {
            self.transport.request_service_start();
        }
    }

    /// Apply the length limit while stopped. Completed messages are
    /// dropped unvalidated.
    fn discard_input(&self) {
        if let Some(message) = self.assembler.poll() {
            tracing::debug!(len = message.len(), "Input while stopped, discarding");
        }
    }

    fn poll_input(&mut self, now: Duration) {
        if let Some(message) = self.assembler.poll() {
            self.handle_message(&message, now);
        }
    }

    fn poll_hold(&mut self, now: Duration) {
        // Input that arrives while a result is displayed is dropped.
        self.assembler.clear();
        if now.saturating_sub(self.state_entered_at) >= HOLD_DURATION {
            self.set_state(SessionState::Idle, now);
        }
    }

    fn handle_message(&mut self, message: &PinMessage, now: Duration) {
        let verdict = if message.is_empty() {
            tracing::debug!("Empty PIN message");
            Verdict::Rejected
        } else {
            message.as_str().map_or_else(
                || {
                    tracing::debug!(len = message.len(), "PIN input is not UTF-8");
                    Verdict::Rejected
                },
                |candidate| {
                    let counter = self.hotp_counter().unwrap_or(0);
                    self.validator
                        .validate(candidate, counter, self.clock.unix_time())
                },
            )
        };

        if verdict == Verdict::Accepted {
            if let Some(counter) = self.counter.as_mut() {
                let next = counter.advance();
                tracing::debug!(counter = next, "HOTP counter advanced");
            }
        }

        tracing::info!(verdict = %verdict, len = message.len(), "PIN validated");
        self.set_state(verdict.into(), now);
    }

    fn finish_stop(&mut self, now: Duration) {
        self.transport.request_service_stop();
        self.set_state(SessionState::Stopped, now);
        tracing::info!("Service stopped");
    }

    /// Returns `false` (and does nothing) when `state` is already current.
    fn set_state(&mut self, state: SessionState, now: Duration) -> bool {
        let old = self.state;
        if state == old {
            return false;
        }
        tracing::debug!(from = %old, to = %state, "Setting state");
        self.state = state;
        self.state_entered_at = now;
        self.transport
            .publish_status(state, old != SessionState::Stopped);

        let change = StateChange {
            from: old,
            to: state,
        };
        for listener in &mut self.listeners {
            listener(change);
        }
        true
    }
}

impl<T, S, C> fmt::Debug for PinpadSession<T, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinpadSession")
            .field("state", &self.state)
            .field("security_mode", &self.validator.mode())
            .field("should_start", &self.should_start)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
