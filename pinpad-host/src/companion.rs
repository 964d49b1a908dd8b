//! Client-side PIN computation, matching what the device expects.
//!
//! The device keys its HMAC with the raw bytes of the configured secret,
//! so the companion does the same.

use pinpad_crypto_core::{hotp_generate, render_code, totp_generate, SecretBuffer, OTP_DIGITS};

use crate::cli::OtpMode;

/// PIN for `mode`. `counter` is used by HOTP and `unix_time` by TOTP.
#[must_use]
pub fn code(mode: OtpMode, secret: String, counter: u64, unix_time: u64) -> String {
    let key = SecretBuffer::from_string(secret);
    let value = match mode {
        OtpMode::Hotp => hotp_generate(key.expose(), counter, OTP_DIGITS),
        OtpMode::Totp => totp_generate(key.expose(), unix_time),
    };
    render_code(value, OTP_DIGITS)
}
