//! Console stand-in for the BLE radio stack.
//!
//! Service lifecycle and status updates are printed as one line each, the
//! way a GATT server would expose them to a subscribed client.

use std::fmt;
use std::io::{self, Write};

use pinpad_engine::{uuids, SessionState, Transport};

/// Characteristics hosted by the service, with their access.
const CHARACTERISTICS: [(&str, &str); 5] = [
    (uuids::STATUS, "status read/notify"),
    (uuids::RPC_COMMAND, "command write"),
    (uuids::RPC_RESPONSE, "response read/notify"),
    (uuids::SECURITY_MODE, "security-mode read"),
    (uuids::HOTP_COUNTER, "hotp-counter read"),
];

/// Radio that is always able to host the service and reports to a writer.
pub struct ConsoleRadio {
    out: Box<dyn Write + Send>,
    running: bool,
    advertising: bool,
}

impl ConsoleRadio {
    /// Radio printing to `out`.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            running: false,
            advertising: false,
        }
    }

    /// Radio printing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Whether the service is currently advertised.
    #[must_use]
    pub const fn is_advertising(&self) -> bool {
        self.advertising
    }

    /// Print one line. Output errors are logged and otherwise ignored.
    pub fn print(&mut self, line: impl fmt::Display) {
        let result = writeln!(self.out, "{line}").and_then(|()| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, "Console output failed");
        }
    }
}

impl Transport for ConsoleRadio {
    fn is_service_running(&self) -> bool {
        self.running
    }

    fn request_service_start(&mut self) {
        self.running = true;
        self.print(format_args!("service up {}", uuids::SERVICE));
        for (uuid, role) in CHARACTERISTICS {
            self.print(format_args!("  characteristic {uuid} {role}"));
        }
    }

    fn request_advertising_start(&mut self) {
        self.advertising = true;
        self.print("advertising");
    }

    fn request_service_stop(&mut self) {
        self.running = false;
        self.advertising = false;
        self.print("service down");
    }

    fn publish_status(&mut self, state: SessionState, notify: bool) {
        let suffix = if notify { " notify" } else { "" };
        self.print(format_args!(
            "status {:#04x} {state}{suffix}",
            state.as_byte()
        ));
    }
}

impl fmt::Debug for ConsoleRadio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleRadio")
            .field("running", &self.running)
            .field("advertising", &self.advertising)
            .finish_non_exhaustive()
    }
}
