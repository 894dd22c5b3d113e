//! Host-store contract and in-memory implementations.
//!
//! The engine does not own its keyspace: waves live in some key/value
//! store, behind a wire protocol and dispatcher that are the host's
//! business. [`WaveStore`] names the only contract the command surface
//! needs from that store. [`MemStore`] implements it in memory for tests
//! and direct embedding.

use std::collections::HashMap;

use parking_lot::Mutex;
use swave_core::Wave;
use swave_error::{Result, WaveError};

/// Contract the command surface expects from the hosting key/value store.
pub trait WaveStore {
    /// Typed read access; `Err(WrongType)` when the key holds a non-wave.
    fn lookup(&self, key: &str) -> Result<Option<&Wave>>;

    /// Typed write access; `Err(WrongType)` when the key holds a non-wave.
    fn lookup_mut(&mut self, key: &str) -> Result<Option<&mut Wave>>;

    /// Store a wave under `key`, replacing any previous value.
    fn insert(&mut self, key: &str, wave: Wave);

    /// Replace the key's expiry deadline (absolute milliseconds). Hosts
    /// without key expiry may ignore this.
    fn set_expiry(&mut self, key: &str, deadline_ms: i64);
}

/// A value slot in [`MemStore`]. Real hosts store heterogeneous values
/// under one keyspace, so the in-memory store does too.
#[derive(Debug)]
pub enum MemValue {
    Wave(Wave),
    Opaque(String),
}

/// In-memory [`WaveStore`] for tests and single-threaded embedding.
#[derive(Debug, Default)]
pub struct MemStore {
    entries: HashMap<String, MemValue>,
    expirations: HashMap<String, i64>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a non-wave value, as a foreign command on the host would.
    pub fn put_opaque(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(key.to_owned(), MemValue::Opaque(value.into()));
    }

    /// Drop a key, releasing the wave and everything it owns.
    pub fn remove(&mut self, key: &str) -> bool {
        self.expirations.remove(key);
        self.entries.remove(key).is_some()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The key's expiry deadline, if one has been pushed.
    #[must_use]
    pub fn expiry(&self, key: &str) -> Option<i64> {
        self.expirations.get(key).copied()
    }
}

impl WaveStore for MemStore {
    fn lookup(&self, key: &str) -> Result<Option<&Wave>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(MemValue::Wave(wave)) => Ok(Some(wave)),
            Some(MemValue::Opaque(_)) => Err(WaveError::WrongType),
        }
    }

    fn lookup_mut(&mut self, key: &str) -> Result<Option<&mut Wave>> {
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(MemValue::Wave(wave)) => Ok(Some(wave)),
            Some(MemValue::Opaque(_)) => Err(WaveError::WrongType),
        }
    }

    fn insert(&mut self, key: &str, wave: Wave) {
        self.entries.insert(key.to_owned(), MemValue::Wave(wave));
    }

    fn set_expiry(&mut self, key: &str, deadline_ms: i64) {
        self.expirations.insert(key.to_owned(), deadline_ms);
    }
}

/// Mutex-guarded [`MemStore`] for hosts that dispatch from several
/// threads. The lock serializes every command touching the store, which
/// also satisfies the engine's per-wave atomicity requirement.
#[derive(Debug, Default)]
pub struct SharedMemStore {
    inner: Mutex<MemStore>,
}

impl SharedMemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the underlying store.
    pub fn with<R>(&self, f: impl FnOnce(&mut MemStore) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
