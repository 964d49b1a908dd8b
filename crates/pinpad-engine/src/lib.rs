//! `pinpad-engine`: PIN validation engine for the BLE pinpad.
//!
//! Reassembles PIN messages from transport chunks, validates them against
//! a static PIN, an HOTP code, or a TOTP code, and runs the
//! Stopped/Idle/Accepted/Rejected session. The radio stack, the clock and
//! counter storage are injected; nothing here touches hardware.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod assembler;
pub mod clock;
pub mod config;
pub mod counter;
pub mod error;
pub mod session;
pub mod timer;
pub mod transport;
pub mod validator;

pub use assembler::{ChunkSink, InputAssembler, PinMessage, INPUT_MAX_LEN};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PinpadConfig, SecurityMode, DEFAULT_COUNTER_FILE};
pub use counter::{CounterStore, FileCounterStore, HotpCounter, MemoryCounterStore};
pub use error::{PinpadError, StorageUnavailable};
pub use session::{
    PinpadSession, SessionState, StateChange, StateListener, HOLD_DURATION, STOP_GRACE,
};
pub use timer::TimerQueue;
pub use transport::{uuids, PublishedAttributes, Transport};
pub use validator::{Validator, Verdict};
