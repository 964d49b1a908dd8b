//! Line protocol of the console transport.

use std::fmt;
use std::str::FromStr;

/// One stdin line, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A client connected.
    Connect,
    /// The client disconnected.
    Disconnect,
    /// Request the service to start.
    Start,
    /// Request the service to stop after the grace period.
    Stop,
    /// Print the published attributes.
    Status,
    /// A client wrote a PIN. The payload is sent verbatim, terminated.
    Pin(String),
}

impl HostEvent {
    /// Bytes written to the input characteristic for a `pin` line.
    #[must_use]
    pub fn pin_wire_bytes(pin: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(pin.len().saturating_add(1));
        bytes.extend_from_slice(pin.as_bytes());
        bytes.push(b'\n');
        bytes
    }
}

/// A stdin line that is not a known event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    #[error("empty line")]
    Empty,
    #[error("`pin` needs a value, e.g. `pin 1234`")]
    MissingPin,
    #[error("unknown command `{0}`")]
    Unknown(String),
}

impl FromStr for HostEvent {
    type Err = EventParseError;

    /// Command words are case-insensitive; the `pin` payload is taken
    /// verbatim after the first space.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (word, rest) = match line.split_once(' ') {
            Some((word, rest)) => (word, Some(rest)),
            None => (line.trim(), None),
        };
        match (word.to_ascii_lowercase().as_str(), rest) {
            ("", _) => Err(EventParseError::Empty),
            ("pin", Some(pin)) => Ok(Self::Pin(pin.to_owned())),
            ("pin", None) => Err(EventParseError::MissingPin),
            ("connect", _) => Ok(Self::Connect),
            ("disconnect", _) => Ok(Self::Disconnect),
            ("start", _) => Ok(Self::Start),
            ("stop", _) => Ok(Self::Stop),
            ("status", _) => Ok(Self::Status),
            (other, _) => Err(EventParseError::Unknown(other.to_owned())),
        }
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Disconnect => f.write_str("disconnect"),
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
            Self::Status => f.write_str("status"),
            // Never echo the PIN itself.
            Self::Pin(pin) => write!(f, "pin ({} bytes)", pin.len()),
        }
    }
}
