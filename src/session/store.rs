//! In-memory session state and flash data aging.
//!
//! A [`Store`] is hydrated from its handler with [`SessionStore::start`],
//! mutated by the request, and persisted with [`SessionStore::save`]. Each
//! save ages flash data by one generation:
//!
//! 1. keys flashed in the previous lifecycle are removed
//! 2. keys flashed in this lifecycle become the previous lifecycle
//! 3. the payload is encoded and written
//!
//! So a flashed value survives the request that set it and exactly one
//! more save.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::session::codec::{self, Attributes, FlashKeys, SessionPayload};
use crate::session::error::SessionResult;
use crate::session::handler::SessionHandler;

/// Operations shared by plain and encrypted session stores.
pub trait SessionStore: Send {
    /// Cookie name the session is exposed under.
    fn name(&self) -> &str;

    /// Opaque session identifier.
    fn id(&self) -> &str;

    /// The backend the session persists through.
    fn handler(&self) -> &dyn SessionHandler;

    /// Load the session from its handler.
    ///
    /// Missing or undecodable data starts an empty session.
    fn start(&mut self) -> SessionResult<()>;

    /// Age flash data and persist the session.
    fn save(&mut self) -> SessionResult<()>;

    /// Whether [`SessionStore::start`] has run.
    fn is_started(&self) -> bool;

    /// Snapshot of all attributes.
    fn all(&self) -> Attributes;

    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<&Value>;

    /// Get `key`, or `default` if it is absent.
    fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    fn put(&mut self, key: &str, value: Value);

    /// Append `value` to the sequence stored at `key`.
    ///
    /// Absent keys and non-sequence values are replaced by `[value]`.
    fn push(&mut self, key: &str, value: Value);

    /// Remove `key`, returning its value. The key is no longer flash data.
    fn pull(&mut self, key: &str) -> Option<Value>;

    fn pull_or(&mut self, key: &str, default: Value) -> Value {
        self.pull(key).unwrap_or(default)
    }

    fn forget(&mut self, key: &str);

    fn forget_many(&mut self, keys: &[&str]) {
        for key in keys {
            self.forget(key);
        }
    }

    /// Remove every attribute and forget all flash bookkeeping.
    fn flush(&mut self);

    /// Put a value that is removed after the next save cycle.
    fn flash(&mut self, key: &str, value: Value);

    /// Keep all flash data for another lifecycle.
    fn reflash(&mut self);

    /// Keep the given flash keys for another lifecycle.
    fn keep(&mut self, keys: &[&str]);

    /// Drop all state and destroy the stored payload.
    fn invalidate(&mut self) -> SessionResult<()>;
}

/// The default session store.
pub struct Store {
    name: String,
    id: String,
    handler: Arc<dyn SessionHandler>,
    attributes: Attributes,
    flash_new: BTreeSet<String>,
    flash_old: BTreeSet<String>,
    started: bool,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("flash_new", &self.flash_new)
            .field("flash_old", &self.flash_old)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl Store {
    pub fn new(
        name: impl Into<String>,
        handler: Arc<dyn SessionHandler>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            handler,
            attributes: Attributes::new(),
            flash_new: BTreeSet::new(),
            flash_old: BTreeSet::new(),
            started: false,
        }
    }

    /// Shared handle to the handler, for building sibling stores.
    #[must_use]
    pub fn shared_handler(&self) -> Arc<dyn SessionHandler> {
        Arc::clone(&self.handler)
    }

    /// Replace state with a decoded payload; bad or empty bytes give an empty session.
    pub(crate) fn load_payload(&mut self, bytes: &[u8]) {
        let payload = if bytes.is_empty() {
            log::trace!("No stored data for session {}", self.id);
            SessionPayload::default()
        } else {
            match codec::decode(bytes) {
                Ok(payload) => payload,
                Err(e) => {
                    log::warn!("Discarding undecodable session {}: {}", self.id, e);
                    SessionPayload::default()
                }
            }
        };

        self.attributes = payload.attributes;
        self.flash_new = payload.flash.new;
        self.flash_old = payload.flash.old;
        self.started = true;
    }

    /// Age flash data and encode the result, ready to be written.
    pub(crate) fn prepare_payload(&mut self) -> SessionResult<Vec<u8>> {
        self.age_flash_data();

        let payload = SessionPayload {
            attributes: self.attributes.clone(),
            flash: FlashKeys {
                new: self.flash_new.clone(),
                old: self.flash_old.clone(),
            },
        };
        Ok(codec::encode(&payload)?)
    }

    /// A removed key stops being flash data, so reusing it later is safe.
    fn untrack_flash(&mut self, key: &str) {
        self.flash_new.remove(key);
        self.flash_old.remove(key);
    }

    fn age_flash_data(&mut self) {
        for key in std::mem::take(&mut self.flash_old) {
            self.attributes.remove(&key);
        }
        self.flash_old = std::mem::take(&mut self.flash_new);
    }
}

impl SessionStore for Store {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn handler(&self) -> &dyn SessionHandler {
        self.handler.as_ref()
    }

    fn start(&mut self) -> SessionResult<()> {
        let bytes = self.handler.read(&self.id)?;
        self.load_payload(&bytes);
        log::debug!(
            "Started session {} with {} attribute(s)",
            self.id,
            self.attributes.len()
        );
        Ok(())
    }

    fn save(&mut self) -> SessionResult<()> {
        let bytes = self.prepare_payload()?;
        self.handler.write(&self.id, &bytes)?;
        log::debug!("Saved session {}", self.id);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn all(&self) -> Attributes {
        self.attributes.clone()
    }

    fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    fn put(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_string(), value);
    }

    fn push(&mut self, key: &str, value: Value) {
        match self.attributes.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                self.attributes
                    .insert(key.to_string(), Value::Array(vec![value]));
            }
        }
    }

    fn pull(&mut self, key: &str) -> Option<Value> {
        self.untrack_flash(key);
        self.attributes.remove(key)
    }

    fn forget(&mut self, key: &str) {
        self.untrack_flash(key);
        self.attributes.remove(key);
    }

    fn flush(&mut self) {
        self.attributes.clear();
        self.flash_new.clear();
        self.flash_old.clear();
    }

    fn flash(&mut self, key: &str, value: Value) {
        self.put(key, value);
        self.flash_new.insert(key.to_string());
        self.flash_old.remove(key);
    }

    fn reflash(&mut self) {
        let old = std::mem::take(&mut self.flash_old);
        self.flash_new.extend(old);
    }

    fn keep(&mut self, keys: &[&str]) {
        for key in keys {
            if self.flash_old.remove(*key) {
                self.flash_new.insert((*key).to_string());
            }
        }
    }

    fn invalidate(&mut self) -> SessionResult<()> {
        self.attributes.clear();
        self.flash_new.clear();
        self.flash_old.clear();
        self.handler.destroy(&self.id)
    }
}
