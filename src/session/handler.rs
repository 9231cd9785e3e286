//! The storage boundary for session payloads.
//!
//! A [`SessionHandler`] persists raw bytes by session id and knows nothing
//! about attributes or flash data. Any backend (files, a database, a cache)
//! plugs into [`crate::session::SessionManager`] by implementing this trait
//! and registering a factory with `extend`.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use crate::session::error::SessionResult;

/// Raw, id-keyed persistence for session payloads.
///
/// Handlers are shared between stores, so every method takes `&self`.
pub trait SessionHandler: Send + Sync + 'static {
    /// Return the stored payload for `id`, or an empty vector if there is none.
    fn read(&self, id: &str) -> SessionResult<Vec<u8>>;

    /// Persist `payload` for `id`, replacing any previous value.
    ///
    /// The data must be durable by the time this returns.
    fn write(&self, id: &str, payload: &[u8]) -> SessionResult<()>;

    /// Remove the payload for `id`. Missing ids are not an error.
    fn destroy(&self, id: &str) -> SessionResult<()>;

    /// Remove every payload last written more than `max_lifetime` ago.
    ///
    /// Returns the number of payloads removed. Entries that cannot be
    /// inspected are skipped.
    fn gc(&self, max_lifetime: Duration) -> SessionResult<usize>;

    /// Access the concrete handler, e.g. to downcast in tests.
    fn as_any(&self) -> &dyn Any;
}

/// A handler that stores nothing.
///
/// Reads are always empty and writes are discarded. Backs the `null` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSessionHandler;

impl SessionHandler for NullSessionHandler {
    fn read(&self, _id: &str) -> SessionResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn write(&self, _id: &str, _payload: &[u8]) -> SessionResult<()> {
        Ok(())
    }

    fn destroy(&self, _id: &str) -> SessionResult<()> {
        Ok(())
    }

    fn gc(&self, _max_lifetime: Duration) -> SessionResult<usize> {
        Ok(0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    payload: Vec<u8>,
    written_at: SystemTime,
}

/// Process-local handler keeping payloads in a map. Backs the `array` driver.
#[derive(Debug, Default)]
pub struct MemorySessionHandler {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemorySessionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, age: Duration) {
        if let Some(entry) = self.lock().get_mut(id) {
            entry.written_at = SystemTime::now() - age;
        }
    }
}

impl SessionHandler for MemorySessionHandler {
    fn read(&self, id: &str) -> SessionResult<Vec<u8>> {
        Ok(self
            .lock()
            .get(id)
            .map(|entry| entry.payload.clone())
            .unwrap_or_default())
    }

    fn write(&self, id: &str, payload: &[u8]) -> SessionResult<()> {
        self.lock().insert(
            id.to_string(),
            MemoryEntry {
                payload: payload.to_vec(),
                written_at: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn destroy(&self, id: &str) -> SessionResult<()> {
        self.lock().remove(id);
        Ok(())
    }

    fn gc(&self, max_lifetime: Duration) -> SessionResult<usize> {
        let now = SystemTime::now();
        let mut entries = self.lock();
        let before = entries.len();
        // Entries with a clock in the future are kept
        entries.retain(|_, entry| {
            now.duration_since(entry.written_at)
                .map_or(true, |age| age <= max_lifetime)
        });
        Ok(before - entries.len())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
