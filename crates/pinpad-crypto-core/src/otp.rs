//! RFC 4226 HOTP and RFC 6238 TOTP code generation.
//!
//! Codes are computed with HMAC-SHA1 via `ring::hmac`, the algorithm every
//! stock authenticator app defaults to. Functions return the raw numeric
//! code; use [`render_code`] to get the zero-padded form a client types in.

use ring::hmac;

use crate::CryptoError;

// ── Constants ───────────────────────────────────────────────────────

/// TOTP time step in seconds (RFC 6238 §4).
pub const TOTP_TIME_STEP: u32 = 30;

/// Digit count used by the pinpad for both HOTP and TOTP.
pub const OTP_DIGITS: OtpDigits = OtpDigits::Six;

// ── Types ───────────────────────────────────────────────────────────

/// Number of digits in an OTP code (6 or 8 only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpDigits {
    /// 6-digit code (standard).
    Six,
    /// 8-digit code. The engine never uses it; it exists so codes can be
    /// checked against the 8-digit RFC 6238 test vectors.
    Eight,
}

impl OtpDigits {
    /// Return the numeric digit count.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Six => 6,
            Self::Eight => 8,
        }
    }

    /// Return the modulus value (10^digits) for truncation.
    #[must_use]
    const fn modulus(self) -> u32 {
        match self {
            Self::Six => 1_000_000,
            Self::Eight => 100_000_000,
        }
    }
}

// ── HOTP (RFC 4226) ────────────────────────────────────────────────

/// Generate an HOTP code per RFC 4226.
///
/// An empty `key` is accepted and yields a code; rejecting empty secrets
/// is the caller's job.
///
/// The result is always in `[0, 10^digits)`.
#[must_use = "OTP code should be used or compared"]
pub fn hotp_generate(key: &[u8], counter: u64, digits: OtpDigits) -> u32 {
    // HMAC(K, C) where C is counter as 8-byte big-endian (RFC 4226 §5.2).
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key);
    let tag = hmac::sign(&key, &counter.to_be_bytes());

    // binary_code is masked to 31 bits; modulus is never zero.
    #[allow(clippy::arithmetic_side_effects)]
    let code = dynamic_truncate(tag.as_ref()) % digits.modulus();
    code
}

/// Dynamic truncation (RFC 4226 §5.3).
///
/// Offset is the low nibble of the last digest byte; the four bytes at the
/// offset are read big-endian with the top bit cleared.
fn dynamic_truncate(digest: &[u8]) -> u32 {
    let last = digest.last().copied().unwrap_or_default();
    let offset = usize::from(last & 0x0F);

    // SHA-1 digests are 20 bytes, offset <= 15, so offset + 3 <= 18.
    u32::from_be_bytes([
        digest[offset] & 0x7F,
        digest[offset.wrapping_add(1)],
        digest[offset.wrapping_add(2)],
        digest[offset.wrapping_add(3)],
    ])
}

/// Render a numeric code as a zero-padded decimal string.
#[must_use]
pub fn render_code(code: u32, digits: OtpDigits) -> String {
    let width = usize::from(digits.value());
    format!("{code:0>width$}")
}

// ── TOTP (RFC 6238) ────────────────────────────────────────────────

/// Generate the pinpad's TOTP code: 6 digits, 30-second step.
///
/// `unix_time` must come from a wall clock. A device whose clock drifts
/// past a step boundary rejects legitimate codes.
#[must_use = "OTP code should be used or compared"]
pub fn totp_generate(key: &[u8], unix_time: u64) -> u32 {
    // TOTP_TIME_STEP is a non-zero constant.
    #[allow(clippy::arithmetic_side_effects)]
    let interval = unix_time / u64::from(TOTP_TIME_STEP);
    hotp_generate(key, interval, OTP_DIGITS)
}

/// Generate a TOTP code with an explicit digit count and period.
///
/// Verification helper for the RFC 6238 test vectors. The engine always
/// goes through [`totp_generate`].
///
/// # Errors
/// Returns `CryptoError::Otp` if `period` is 0.
pub fn totp_generate_with(
    key: &[u8],
    unix_time: u64,
    digits: OtpDigits,
    period: u32,
) -> Result<u32, CryptoError> {
    if period == 0 {
        return Err(CryptoError::Otp("period must be > 0".to_owned()));
    }

    // T = floor(time / period) per RFC 6238 §4; period checked above.
    #[allow(clippy::arithmetic_side_effects)]
    let interval = unix_time / u64::from(period);
    Ok(hotp_generate(key, interval, digits))
}

// ── Tests ───────────────────────────────────────────────────────────
