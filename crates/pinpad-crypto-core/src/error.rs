//! Cryptographic error types for `pinpad-crypto-core`.

use thiserror::Error;

/// Errors produced by OTP operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// HOTP/TOTP parameter rejected (zero period).
    #[error("OTP error: {0}")]
    Otp(String),

    /// Invalid key material (e.g. an empty secret where one is required).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}
