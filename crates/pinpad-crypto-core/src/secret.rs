//! Holder for the pinpad's shared secret.
//!
//! [`SecretBuffer`] wraps a [`SecretSlice<u8>`] so that:
//! - the bytes are zeroed on drop
//! - `Debug`/`Display` never print them
//! - reading them requires an explicit [`SecretBuffer::expose`] call

use std::fmt;

use secrecy::{ExposeSecret, SecretSlice};
use zeroize::Zeroize;

/// Variable-length buffer for the HMAC key or static PIN.
pub struct SecretBuffer {
    inner: SecretSlice<u8>,
}

impl SecretBuffer {
    /// Copy `data` into a new zeroize-on-drop allocation.
    ///
    /// The caller should zeroize the source afterwards if it owns it.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        Self {
            inner: data.to_vec().into(),
        }
    }

    /// Take ownership of a `String` (e.g. a secret read from config) and
    /// zero the original allocation.
    #[must_use]
    pub fn from_string(mut value: String) -> Self {
        let buffer = Self::new(value.as_bytes());
        value.zeroize();
        buffer
    }

    /// Expose the underlying bytes for an HMAC key or comparison.
    ///
    /// Keep exposure minimal: use the slice within a single expression
    /// rather than binding it to a long-lived variable.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Returns the number of bytes in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Returns `true` if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for SecretBuffer {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expose_returns_original_bytes() {
        let buf = SecretBuffer::new(b"12345678901234567890");
        assert_eq!(buf.expose(), b"12345678901234567890");
        assert_eq!(buf.len(), 20);
        assert!(!buf.is_empty());
    }

    #[test]
    fn debug_and_display_are_masked() {
        let buf = SecretBuffer::from_string("1234".to_owned());
        assert_eq!(format!("{buf:?}"), "SecretBuffer(***)");
        assert_eq!(format!("{buf}"), "SecretBuffer(***)");
        assert!(!format!("{buf:?}").contains("1234"));
    }

    #[test]
    fn empty_buffer_reports_empty() {
        let buf = SecretBuffer::new(&[]);
        assert!(buf.is_empty());
    }

    #[test]
    fn clone_copies_contents() {
        let buf = SecretBuffer::new(b"abc");
        let copy = buf.clone();
        assert_eq!(copy.expose(), b"abc");
    }
}
