//! PIN validation for the configured security mode.

use std::fmt;

use pinpad_crypto_core::{
    constant_time_eq, hotp_generate, render_code, totp_generate, CryptoError, SecretBuffer,
    OTP_DIGITS,
};
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

use crate::config::{PinpadConfig, SecurityMode};
use crate::error::PinpadError;

/// Outcome of checking one PIN candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Candidate matched the expected PIN.
    Accepted,
    /// Candidate did not match.
    Rejected,
}

impl Verdict {
    /// Lowercase string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the security mode and secret and decides every candidate.
#[derive(Debug)]
pub struct Validator {
    mode: SecurityMode,
    secret: SecretBuffer,
}

impl Validator {
    /// Validator for `mode` keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] (wrapped) if `secret` is
    /// empty. Empty HMAC keys are legal in RFC 4226 but never intended.
    pub fn new(mode: SecurityMode, secret: SecretBuffer) -> Result<Self, PinpadError> {
        if secret.is_empty() {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "{mode} mode requires a non-empty secret"
            ))
            .into());
        }
        Ok(Self { mode, secret })
    }

    /// Validator built from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Validator::new`].
    pub fn from_config(config: &PinpadConfig) -> Result<Self, PinpadError> {
        let secret = SecretBuffer::new(config.secret.expose_secret().as_bytes());
        Self::new(config.security_mode, secret)
    }

    /// Configured security mode.
    #[must_use]
    pub const fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Decide `candidate`. Exact, case-sensitive, untrimmed match.
    ///
    /// `counter` is only read in HOTP mode and `unix_time` only in TOTP
    /// mode. TOTP checks the current interval only, with no skew window.
    /// An HOTP counter of `u32::MAX` can never be advanced past, so it
    /// always rejects.
    #[must_use]
    pub fn validate(&self, candidate: &str, counter: u32, unix_time: u64) -> Verdict {
        if self.mode == SecurityMode::Hotp && counter == u32::MAX {
            tracing::warn!("HOTP counter exhausted, rejecting all codes");
            return Verdict::Rejected;
        }

        let expected = self.expected_pin(counter, unix_time);
        if constant_time_eq(candidate.as_bytes(), &expected) {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }

    /// The PIN a client must currently send. Zeroed on drop; never logged.
    pub(crate) fn expected_pin(&self, counter: u32, unix_time: u64) -> Zeroizing<Vec<u8>> {
        let key = self.secret.expose();
        let expected = match self.mode {
            SecurityMode::None => key.to_vec(),
            SecurityMode::Hotp => {
                render_code(hotp_generate(key, u64::from(counter), OTP_DIGITS), OTP_DIGITS)
                    .into_bytes()
            }
            SecurityMode::Totp => {
                render_code(totp_generate(key, unix_time), OTP_DIGITS).into_bytes()
            }
        };
        Zeroizing::new(expected)
    }
}
