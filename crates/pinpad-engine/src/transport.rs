//! Boundary with the radio stack, plus the values it publishes.
//!
//! The engine never touches GATT directly. A host implements [`Transport`]
//! to start/stop the service and to mirror the session state into the
//! status characteristic. Incoming writes reach the engine through a
//! [`ChunkSink`](crate::assembler::ChunkSink); connect and disconnect events
//! are forwarded to the session.

use serde::Serialize;

use crate::session::SessionState;

/// GATT identifiers of the pinpad service.
pub mod uuids {
    /// Pinpad primary service.
    pub const SERVICE: &str = "0003cc02-25ce-4e26-a32f-8c1bfa900000";
    /// Session state byte (read, notify).
    pub const STATUS: &str = "0003cc02-25ce-4e26-a32f-8c1bfa900001";
    /// PIN input (write).
    pub const RPC_COMMAND: &str = "0003cc02-25ce-4e26-a32f-8c1bfa900002";
    /// Reserved response channel (read, notify).
    pub const RPC_RESPONSE: &str = "0003cc02-25ce-4e26-a32f-8c1bfa900003";
    /// Security mode string (read).
    pub const SECURITY_MODE: &str = "0003cc02-25ce-4e26-a32f-8c1bfa900004";
    /// Current HOTP counter as decimal text (read, HOTP only).
    pub const HOTP_COUNTER: &str = "0003cc02-25ce-4e26-a32f-8c1bfa900005";
}

/// Radio-side collaborator driven by the session on its tick.
///
/// Every method must return promptly; the session calls them from the
/// main loop.
pub trait Transport {
    /// Whether the GATT service is up and able to advertise.
    fn is_service_running(&self) -> bool;

    /// Ask the stack to bring the service up. The session polls
    /// [`is_service_running`](Self::is_service_running) on later ticks.
    fn request_service_start(&mut self);

    /// Begin advertising the service.
    fn request_advertising_start(&mut self);

    /// Tear the service down.
    fn request_service_stop(&mut self);

    /// Mirror `state` into the status characteristic. `notify` is `false`
    /// when leaving `Stopped`, since no client can be subscribed yet.
    fn publish_status(&mut self, state: SessionState, notify: bool);
}

/// Read-only values a client can fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedAttributes {
    /// `"stopped" | "idle" | "accepted" | "rejected"`.
    pub state: &'static str,
    /// `"none" | "hotp" | "totp"`.
    pub security_mode: &'static str,
    /// Decimal counter, present only in HOTP mode.
    pub hotp_counter: Option<String>,
}
