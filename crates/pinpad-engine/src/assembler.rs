//! Reassembly of PIN messages from transport chunks.
//!
//! The radio stack hands over writes of arbitrary size. Chunks are
//! appended as-is; framing is decided only when the engine polls:
//! - more than [`INPUT_MAX_LEN`] bytes buffered: discard everything
//! - last byte is NUL or `\n`: the buffer minus that byte is a message
//! - otherwise: keep waiting

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Maximum number of buffered bytes inspected as a message.
pub const INPUT_MAX_LEN: usize = 255;

/// Bytes that end a message.
const TERMINATORS: [u8; 2] = [b'\0', b'\n'];

/// One complete PIN message, terminator stripped.
#[derive(Clone, PartialEq, Eq)]
pub struct PinMessage(Vec<u8>);

impl PinMessage {
    /// Raw message bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Message as UTF-8, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Message length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the message is empty (a bare terminator).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// PIN candidates are credentials; never print them.
impl fmt::Debug for PinMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinMessage({} bytes)", self.0.len())
    }
}

/// Cloneable append-only handle for transport callbacks.
///
/// May be used from any thread. It only takes the buffer lock long enough
/// to extend the vector.
#[derive(Clone, Default)]
pub struct ChunkSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl ChunkSink {
    /// Append `bytes` to the incoming buffer. No validation, no bounds
    /// check; oversized input is handled at poll time.
    pub fn on_chunk(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        lock(&self.buffer).extend_from_slice(bytes);
    }
}

impl fmt::Debug for ChunkSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChunkSink(***)")
    }
}

/// The engine-side view of the incoming buffer.
#[derive(Debug)]
pub struct InputAssembler {
    sink: ChunkSink,
}

impl InputAssembler {
    /// Empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sink: ChunkSink::default(),
        }
    }

    /// Handle to give to the transport.
    #[must_use]
    pub fn sink(&self) -> ChunkSink {
        self.sink.clone()
    }

    /// Append `bytes`. Same as [`ChunkSink::on_chunk`].
    pub fn on_chunk(&self, bytes: &[u8]) {
        self.sink.on_chunk(bytes);
    }

    /// Inspect the buffer once; called every tick.
    ///
    /// Returns a message only when the buffer is within the limit and ends
    /// with a terminator. Both a returned message and an overflow leave the
    /// buffer empty.
    pub fn poll(&self) -> Option<PinMessage> {
        let mut buffer = lock(&self.sink.buffer);
        let len = buffer.len();
        if len == 0 {
            return None;
        }

        if len > INPUT_MAX_LEN {
            tracing::debug!(
                len,
                max = INPUT_MAX_LEN,
                "Oversized or malformed input, discarding buffer"
            );
            buffer.clear();
            return None;
        }

        let last = buffer.last().copied()?;
        if !TERMINATORS.contains(&last) {
            tracing::trace!(len, "Waiting for more data");
            return None;
        }

        let mut bytes = std::mem::take(&mut *buffer);
        bytes.pop();
        tracing::debug!(len = bytes.len(), "PIN message assembled");
        Some(PinMessage(bytes))
    }

    /// Drop any partial input.
    pub fn clear(&self) {
        lock(&self.sink.buffer).clear();
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        lock(&self.sink.buffer).len()
    }
}

impl Default for InputAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock the buffer, ignoring poisoning.
fn lock(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}
