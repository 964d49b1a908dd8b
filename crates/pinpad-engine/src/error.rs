//! Engine error types for `pinpad-engine`.

use pinpad_crypto_core::CryptoError;
use thiserror::Error;

/// Counter storage could not be read or written.
///
/// Never fatal: a failed load falls back to 0 and a failed save leaves
/// only the in-memory counter advanced.
#[derive(Debug, Error)]
#[error("counter storage unavailable: {0}")]
pub struct StorageUnavailable(pub String);

/// Errors produced while setting up or running the pinpad engine.
#[derive(Debug, Error)]
pub enum PinpadError {
    /// Configuration rejected at startup (unknown security mode, empty
    /// secret, unparsable file). Startup must abort.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Cryptographic setup failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
