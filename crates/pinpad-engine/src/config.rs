//! Pinpad configuration: security mode, shared secret and counter location.
//!
//! Read once at startup from a JSON file. The secret is deserialized
//! straight into a [`SecretString`] so it never sits in a plain `String`
//! and never shows up in `Debug` output.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PinpadError;

// ── Security mode ──────────────────────────────────────────────────

/// How the expected PIN is derived. Fixed for the lifetime of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// The secret is itself the static PIN.
    None,
    /// RFC 4226 counter-based code.
    Hotp,
    /// RFC 6238 time-based code.
    Totp,
}

impl SecurityMode {
    /// Published string form (`"none"`, `"hotp"`, `"totp"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hotp => "hotp",
            Self::Totp => "totp",
        }
    }

    /// Whether the mode uses the shared secret as HMAC key material.
    #[must_use]
    pub const fn is_otp(self) -> bool {
        matches!(self, Self::Hotp | Self::Totp)
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Config file ────────────────────────────────────────────────────

/// Startup configuration for one pinpad.
///
/// ```json
/// { "securityMode": "hotp", "secret": "12345678901234567890", "counterPath": "counter.json" }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PinpadConfig {
    /// How the expected PIN is derived.
    pub security_mode: SecurityMode,

    /// HMAC key (HOTP/TOTP) or the static PIN (none).
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret: SecretString,

    /// Where the HOTP counter is persisted. Relative paths resolve against
    /// the config file's directory.
    #[serde(default)]
    pub counter_path: Option<PathBuf>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Default counter file name, next to the config file.
pub const DEFAULT_COUNTER_FILE: &str = "hotp_counter.json";

impl PinpadConfig {
    /// Build a config in code (tests, embedding hosts).
    #[must_use]
    pub fn new(security_mode: SecurityMode, secret: &str) -> Self {
        Self {
            security_mode,
            secret: SecretString::from(secret.to_owned()),
            counter_path: None,
        }
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`PinpadError::InvalidConfiguration`] for malformed JSON,
    /// an unknown security mode, or an empty secret.
    pub fn from_json(json: &str) -> Result<Self, PinpadError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PinpadError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate `path`. A relative `counterPath` is resolved
    /// against the file's parent directory.
    ///
    /// # Errors
    ///
    /// - [`PinpadError::Io`] if the file cannot be read.
    /// - [`PinpadError::InvalidConfiguration`] if its contents are rejected.
    pub fn load(path: &Path) -> Result<Self, PinpadError> {
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_json(&contents)?;
        if let (Some(counter), Some(dir)) = (&config.counter_path, path.parent()) {
            if counter.is_relative() {
                config.counter_path = Some(dir.join(counter));
            }
        }
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`PinpadError::InvalidConfiguration`] if the secret is empty.
    pub fn validate(&self) -> Result<(), PinpadError> {
        if self.secret.expose_secret().is_empty() {
            let what = if self.security_mode.is_otp() {
                "secret"
            } else {
                "static PIN"
            };
            return Err(PinpadError::InvalidConfiguration(format!(
                "{what} must not be empty"
            )));
        }
        Ok(())
    }

    /// Counter file to use, falling back to [`DEFAULT_COUNTER_FILE`] in
    /// `default_dir`.
    #[must_use]
    pub fn counter_path_or(&self, default_dir: &Path) -> PathBuf {
        self.counter_path
            .clone()
            .unwrap_or_else(|| default_dir.join(DEFAULT_COUNTER_FILE))
    }
}

// ── Tests ──────────────────────────────────────────────────────────
