#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for `PinpadSession`: end-to-end PIN validation,
//! HOTP counter persistence, hold expiry, disconnects and deferred stop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pinpad_crypto_core::SecretBuffer;
use pinpad_engine::{
    ManualClock, MemoryCounterStore, PinpadConfig, PinpadSession, SecurityMode, SessionState,
    StateChange, Transport, Validator, HOLD_DURATION, INPUT_MAX_LEN, STOP_GRACE,
};

const RFC_SECRET: &[u8] = b"12345678901234567890";

/// Radio that is always ready and records what the session asked for.
#[derive(Debug, Default)]
struct RecordingRadio {
    running: bool,
    advertise_requests: usize,
    stop_requests: usize,
    published: Vec<(SessionState, bool)>,
}

impl Transport for RecordingRadio {
    fn is_service_running(&self) -> bool {
        self.running
    }
    fn request_service_start(&mut self) {
        self.running = true;
    }
    fn request_advertising_start(&mut self) {
        self.advertise_requests += 1;
    }
    fn request_service_stop(&mut self) {
        self.stop_requests += 1;
        self.running = false;
    }
    fn publish_status(&mut self, state: SessionState, notify: bool) {
        self.published.push((state, notify));
    }
}

type TestSession = PinpadSession<RecordingRadio, MemoryCounterStore, ManualClock>;

struct Harness {
    session: TestSession,
    clock: ManualClock,
    store: MemoryCounterStore,
    changes: Arc<Mutex<Vec<StateChange>>>,
}

impl Harness {
    fn new(mode: SecurityMode, secret: &[u8], store: MemoryCounterStore) -> Self {
        let clock = ManualClock::at_unix(1_700_000_000);
        let validator = Validator::new(mode, SecretBuffer::new(secret)).unwrap();
        let radio = RecordingRadio {
            running: true,
            ..RecordingRadio::default()
        };
        let mut session = PinpadSession::new(validator, radio, store.clone(), clock.clone());

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        session.register_state_listener(move |change| sink.lock().unwrap().push(change));

        Self {
            session,
            clock,
            store,
            changes,
        }
    }

    fn started(mode: SecurityMode, secret: &[u8], store: MemoryCounterStore) -> Self {
        let mut h = Self::new(mode, secret, store);
        h.session.start();
        h.session.tick();
        assert_eq!(h.session.current_state(), SessionState::Idle);
        h
    }

    fn submit(&mut self, bytes: &[u8]) -> SessionState {
        self.session.on_chunk(bytes);
        self.session.tick();
        self.session.current_state()
    }

    fn wait(&mut self, by: Duration) {
        self.clock.advance(by);
        self.session.tick();
    }

    fn changes(&self) -> Vec<StateChange> {
        self.changes.lock().unwrap().clone()
    }
}

fn change(from: SessionState, to: SessionState) -> StateChange {
    StateChange { from, to }
}

// -------------------------------------------------------------------------
// HOTP end-to-end
// -------------------------------------------------------------------------

#[test]
fn hotp_accept_advances_counter_and_blocks_replay() {
    let mut h = Harness::started(SecurityMode::Hotp, RFC_SECRET, MemoryCounterStore::default());
    assert_eq!(h.session.hotp_counter(), Some(0));

    assert_eq!(h.submit(b"755224\n"), SessionState::Accepted);
    assert_eq!(h.session.hotp_counter(), Some(1));
    assert_eq!(h.store.persisted(), 1);

    h.wait(HOLD_DURATION);
    assert_eq!(h.session.current_state(), SessionState::Idle);

    assert_eq!(h.submit(b"755224\n"), SessionState::Rejected);
    assert_eq!(h.session.hotp_counter(), Some(1), "reject must not advance");
    assert_eq!(h.store.persisted(), 1);
}

#[test]
fn hotp_sequence_follows_rfc4226_codes() {
    let mut h = Harness::started(SecurityMode::Hotp, RFC_SECRET, MemoryCounterStore::default());
    for code in ["755224", "287082", "359152", "969429"] {
        assert_eq!(h.submit(format!("{code}\0").as_bytes()), SessionState::Accepted);
        h.wait(HOLD_DURATION);
    }
    assert_eq!(h.store.persisted(), 4);
}

#[test]
fn hotp_resumes_from_persisted_counter() {
    let store = MemoryCounterStore::with_value(2);
    let mut h = Harness::started(SecurityMode::Hotp, RFC_SECRET, store);
    assert_eq!(h.submit(b"287082\n"), SessionState::Rejected);
    h.wait(HOLD_DURATION);
    assert_eq!(h.submit(b"359152\n"), SessionState::Accepted);
    assert_eq!(h.store.persisted(), 3);
}

#[test]
fn hotp_load_failure_starts_at_zero() {
    let store = MemoryCounterStore::with_value(5);
    store.set_fail_load(true);
    let mut h = Harness::started(SecurityMode::Hotp, RFC_SECRET, store);
    assert_eq!(h.session.hotp_counter(), Some(0));
    assert_eq!(h.submit(b"755224\n"), SessionState::Accepted);
}

#[test]
fn hotp_save_failure_still_blocks_replay_in_process() {
    let store = MemoryCounterStore::default();
    store.set_fail_save(true);
    let mut h = Harness::started(SecurityMode::Hotp, RFC_SECRET, store);

    assert_eq!(h.submit(b"755224\n"), SessionState::Accepted);
    assert_eq!(h.session.hotp_counter(), Some(1));
    assert_eq!(h.store.persisted(), 0);

    h.wait(HOLD_DURATION);
    assert_eq!(h.submit(b"755224\n"), SessionState::Rejected);
}

// -------------------------------------------------------------------------
// Framing through the session
// -------------------------------------------------------------------------

#[test]
fn split_chunks_validate_once_complete() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    assert_eq!(h.submit(b"12"), SessionState::Idle);
    assert_eq!(h.submit(b"34"), SessionState::Idle);
    assert_eq!(h.submit(b"\n"), SessionState::Accepted);
}

#[test]
fn oversized_input_produces_no_verdict() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    let mut data = vec![b'1'; 300];
    data.push(b'\n');
    assert_eq!(h.submit(&data), SessionState::Idle);
    assert_eq!(h.changes(), vec![change(SessionState::Stopped, SessionState::Idle)]);

    assert_eq!(h.submit(b"1234\n"), SessionState::Accepted);
}

#[test]
fn trailing_whitespace_is_not_trimmed() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    assert_eq!(h.submit(b"1234 \n"), SessionState::Rejected);
}

// -------------------------------------------------------------------------
// Hold expiry
// -------------------------------------------------------------------------

#[test]
fn result_returns_to_idle_exactly_once() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.submit(b"9999\n");
    h.wait(Duration::from_millis(250));
    assert!(h.session.is_rejected());
    h.wait(Duration::from_millis(250));
    assert_eq!(h.session.current_state(), SessionState::Idle);
    h.wait(Duration::from_secs(5));
    h.wait(Duration::from_secs(5));

    assert_eq!(
        h.changes(),
        vec![
            change(SessionState::Stopped, SessionState::Idle),
            change(SessionState::Idle, SessionState::Rejected),
            change(SessionState::Rejected, SessionState::Idle),
        ]
    );
}

// -------------------------------------------------------------------------
// Disconnect
// -------------------------------------------------------------------------

#[test]
fn disconnect_during_hold_forces_idle() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.submit(b"1234\n");
    assert!(h.session.is_accepted());

    h.session.on_disconnected();
    assert_eq!(h.session.current_state(), SessionState::Idle);

    // The old hold deadline has no effect on the new Idle state.
    h.wait(HOLD_DURATION);
    assert_eq!(h.session.current_state(), SessionState::Idle);
    assert_eq!(h.changes().len(), 3);
}

#[test]
fn disconnect_discards_partial_input() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    assert_eq!(h.submit(b"12"), SessionState::Idle);
    h.session.on_disconnected();
    assert_eq!(h.submit(b"34\n"), SessionState::Rejected);
}

#[test]
fn disconnect_while_idle_does_not_notify() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.session.on_connected();
    h.session.on_disconnected();
    assert_eq!(h.changes().len(), 1);
}

#[test]
fn disconnect_while_stopped_stays_stopped() {
    let mut h = Harness::new(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.session.on_chunk(b"12");
    h.session.on_disconnected();
    assert_eq!(h.session.current_state(), SessionState::Stopped);
    assert_eq!(h.session.buffered_len(), 0);
    assert!(h.changes().is_empty());

    // The service can still be started afterwards.
    h.session.start();
    h.session.tick();
    assert_eq!(h.session.current_state(), SessionState::Idle);
}

#[test]
fn input_while_stopped_is_bounded() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.session.stop();
    h.wait(STOP_GRACE);
    assert_eq!(h.session.current_state(), SessionState::Stopped);

    let sink = h.session.chunk_sink();
    sink.on_chunk(&[b'7'; 10_000]);
    for _ in 0..100 {
        h.session.tick();
        assert!(h.session.buffered_len() <= INPUT_MAX_LEN);
    }
    assert_eq!(h.session.buffered_len(), 0);
    assert_eq!(h.session.current_state(), SessionState::Stopped);
}

#[test]
fn pin_sent_while_stopped_is_never_validated() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.session.stop();
    h.wait(STOP_GRACE);
    let before = h.changes().len();

    h.submit(b"1234\n");
    h.session.tick();
    assert_eq!(h.session.buffered_len(), 0);
    assert_eq!(h.changes().len(), before);
    assert_eq!(h.session.current_state(), SessionState::Stopped);
}

// -------------------------------------------------------------------------
// Start / stop
// -------------------------------------------------------------------------

#[test]
fn stop_waits_for_grace_period() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.session.stop();
    assert!(h.session.is_stop_pending());

    h.wait(STOP_GRACE - Duration::from_millis(1));
    assert!(h.session.is_active());
    assert_eq!(h.session.transport().stop_requests, 0);

    h.wait(Duration::from_millis(1));
    assert_eq!(h.session.current_state(), SessionState::Stopped);
    assert_eq!(h.session.transport().stop_requests, 1);
    assert!(!h.session.is_stop_pending());
}

#[test]
fn start_during_grace_does_not_cancel_stop() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.session.stop();
    h.wait(Duration::from_millis(100));
    h.session.start();
    h.wait(STOP_GRACE);
    assert_eq!(h.session.current_state(), SessionState::Stopped);

    // Nothing restarts on its own afterwards.
    h.wait(Duration::from_secs(1));
    assert_eq!(h.session.current_state(), SessionState::Stopped);
}

#[test]
fn restart_after_stop_clears_stale_input() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.session.stop();
    h.wait(STOP_GRACE);
    assert_eq!(h.session.current_state(), SessionState::Stopped);

    h.session.on_chunk(b"1234\n");
    h.session.start();
    h.session.tick();
    h.session.tick();
    assert_eq!(h.session.current_state(), SessionState::Idle);
    assert_eq!(h.session.transport().advertise_requests, 2);
}

#[test]
fn leaving_stopped_publishes_without_notify() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    h.submit(b"1234\n");
    h.wait(HOLD_DURATION);
    assert_eq!(
        h.session.transport().published,
        vec![
            (SessionState::Idle, false),
            (SessionState::Accepted, true),
            (SessionState::Idle, true),
        ]
    );
}

// -------------------------------------------------------------------------
// Listeners and published values
// -------------------------------------------------------------------------

#[test]
fn listeners_run_in_registration_order() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 0..3 {
        let order = Arc::clone(&order);
        h.session
            .register_state_listener(move |_| order.lock().unwrap().push(id));
    }
    h.submit(b"1234\n");
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn accepted_listener_sees_accept_only() {
    let mut h = Harness::started(SecurityMode::None, b"1234", MemoryCounterStore::default());
    let accepted = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&accepted);
    h.session.register_state_listener(move |change| {
        if change.to == SessionState::Accepted {
            *counter.lock().unwrap() += 1;
        }
    });
    h.submit(b"0000\n");
    h.wait(HOLD_DURATION);
    h.submit(b"1234\n");
    assert_eq!(*accepted.lock().unwrap(), 1);
}

#[test]
fn published_attributes_in_hotp_mode() {
    let mut h = Harness::started(
        SecurityMode::Hotp,
        RFC_SECRET,
        MemoryCounterStore::with_value(3),
    );
    h.submit(b"969429\n");
    insta::assert_json_snapshot!(h.session.published_attributes(), @r#"
    {
      "state": "accepted",
      "securityMode": "hotp",
      "hotpCounter": "4"
    }
    "#);
}

#[test]
fn published_attributes_in_static_mode() {
    let h = Harness::new(SecurityMode::None, b"1234", MemoryCounterStore::default());
    insta::assert_json_snapshot!(h.session.published_attributes(), @r#"
    {
      "state": "stopped",
      "securityMode": "none",
      "hotpCounter": null
    }
    "#);
}

#[test]
fn session_from_config_file_contents() {
    let config = PinpadConfig::from_json(
        r#"{ "securityMode": "hotp", "secret": "12345678901234567890" }"#,
    )
    .unwrap();
    let validator = Validator::from_config(&config).unwrap();
    let mut session = PinpadSession::new(
        validator,
        RecordingRadio::default(),
        MemoryCounterStore::default(),
        ManualClock::default(),
    );
    session.start();
    session.tick();
    session.tick();
    session.on_chunk(b"755224\n");
    session.tick();
    assert!(session.is_accepted());
}
