//! Persisted HOTP counter.
//!
//! The authoritative value lives in a [`CounterStore`]; [`HotpCounter`]
//! keeps a cached copy that is refreshed on load and on every advance.
//!
//! Storage failures never stop the pinpad:
//! - a failed load starts from 0, which reopens old codes until the
//!   counter catches up
//! - a failed save keeps the advanced value in memory only, so a restart
//!   falls back to the last persisted value

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::StorageUnavailable;

/// Durable home of the HOTP counter.
pub trait CounterStore {
    /// Read the persisted counter.
    ///
    /// # Errors
    ///
    /// Returns [`StorageUnavailable`] if the backing store cannot be read.
    fn load_counter(&self) -> Result<u32, StorageUnavailable>;

    /// Persist `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageUnavailable`] if the value could not be written.
    fn save_counter(&mut self, value: u32) -> Result<(), StorageUnavailable>;
}

// ── Cached counter ─────────────────────────────────────────────────

/// Cached HOTP counter on top of a [`CounterStore`].
#[derive(Debug)]
pub struct HotpCounter<S> {
    store: S,
    value: u32,
}

impl<S: CounterStore> HotpCounter<S> {
    /// Load the counter from `store`, falling back to 0 with a warning.
    pub fn load(store: S) -> Self {
        let value = match store.load_counter() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "HOTP counter load failed, starting from 0 (replay protection weakened)"
                );
                0
            }
        };
        tracing::debug!(counter = value, "HOTP counter loaded");
        Self { store, value }
    }

    /// Cached counter value.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.value
    }

    /// Step the counter after an accepted code and persist it.
    ///
    /// The cached value advances even if the save fails, so the code that
    /// was just accepted cannot be replayed during this process lifetime.
    pub fn advance(&mut self) -> u32 {
        self.value = self.value.saturating_add(1);
        if let Err(e) = self.store.save_counter(self.value) {
            tracing::warn!(
                error = %e,
                counter = self.value,
                "HOTP counter save failed, value will not survive a restart"
            );
        }
        self.value
    }
}

// ── In-memory store ────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    value: u32,
    fail_load: bool,
    fail_save: bool,
}

/// Volatile store for tests and hosts without persistence.
///
/// Clones share state, so a test can keep a handle and inspect what the
/// engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCounterStore {
    /// Store holding `value`.
    #[must_use]
    pub fn with_value(value: u32) -> Self {
        let store = Self::default();
        store.lock().value = value;
        store
    }

    /// Last successfully saved value.
    #[must_use]
    pub fn persisted(&self) -> u32 {
        self.lock().value
    }

    /// Make subsequent loads fail.
    pub fn set_fail_load(&self, fail: bool) {
        self.lock().fail_load = fail;
    }

    /// Make subsequent saves fail.
    pub fn set_fail_save(&self, fail: bool) {
        self.lock().fail_save = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CounterStore for MemoryCounterStore {
    fn load_counter(&self) -> Result<u32, StorageUnavailable> {
        let state = self.lock();
        if state.fail_load {
            return Err(StorageUnavailable("injected load failure".to_owned()));
        }
        Ok(state.value)
    }

    fn save_counter(&mut self, value: u32) -> Result<(), StorageUnavailable> {
        let mut state = self.lock();
        if state.fail_save {
            return Err(StorageUnavailable("injected save failure".to_owned()));
        }
        state.value = value;
        Ok(())
    }
}

// ── JSON file store ────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterFile {
    hotp_counter: u32,
}

/// Counter persisted as `{ "hotpCounter": n }` in a JSON file.
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    path: PathBuf,
}

impl FileCounterStore {
    /// Store backed by `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the counter file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CounterStore for FileCounterStore {
    /// A missing file is a first boot and reads as 0. An unreadable or
    /// corrupt file is an error.
    fn load_counter(&self) -> Result<u32, StorageUnavailable> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StorageUnavailable(format!(
                    "{}: {e}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str::<CounterFile>(&contents)
            .map(|file| file.hotp_counter)
            .map_err(|e| StorageUnavailable(format!("{}: {e}", self.path.display())))
    }

    /// Atomic write: `.tmp` sibling first, then rename over the target.
    fn save_counter(&mut self, value: u32) -> Result<(), StorageUnavailable> {
        let unavailable = |e: std::io::Error| {
            StorageUnavailable(format!("{}: {e}", self.path.display()))
        };
        let tmp = self.tmp_path();

        let json = serde_json::to_string(&CounterFile {
            hotp_counter: value,
        })
        .map_err(|e| StorageUnavailable(e.to_string()))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(unavailable)?;
        }
        let written = fs::write(&tmp, json).and_then(|()| {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
            }
            fs::rename(&tmp, &self.path)
        });

        if let Err(e) = written {
            // Never leave a partial counter file behind.
            let _ = fs::remove_file(&tmp);
            return Err(unavailable(e));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
