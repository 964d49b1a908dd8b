//! `pinpad-crypto-core`: one-time password primitives for the BLE pinpad.
//!
//! This crate is the audit target: zero I/O, zero async, zero logging.
//! It implements exactly HOTP and TOTP over HMAC-SHA1 and nothing else.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod compare;
pub mod error;
pub mod otp;
pub mod secret;

pub use compare::constant_time_eq;
pub use error::CryptoError;
pub use otp::{
    hotp_generate, render_code, totp_generate, totp_generate_with, OtpDigits, OTP_DIGITS,
    TOTP_TIME_STEP,
};
pub use secret::SecretBuffer;
