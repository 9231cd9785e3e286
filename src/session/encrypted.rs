//! A session store whose persisted payload is encrypted.

use std::sync::Arc;

use serde_json::Value;

use crate::encrypter::Encrypter;
use crate::session::codec::Attributes;
use crate::session::error::SessionResult;
use crate::session::handler::SessionHandler;
use crate::session::store::{SessionStore, Store};

/// Wraps a [`Store`], encrypting on save and decrypting on start.
///
/// Every other operation is forwarded unchanged. Ciphertext that fails to
/// decrypt (wrong key, truncation, tampering) starts an empty session and
/// logs a warning rather than failing the request.
pub struct EncryptedStore {
    inner: Store,
    encrypter: Arc<dyn Encrypter>,
}

impl EncryptedStore {
    pub fn new(inner: Store, encrypter: Arc<dyn Encrypter>) -> Self {
        Self { inner, encrypter }
    }

    /// The wrapped plaintext store.
    #[must_use]
    pub fn inner(&self) -> &Store {
        &self.inner
    }
}

impl std::fmt::Debug for EncryptedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStore")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl SessionStore for EncryptedStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn id(&self) -> &str {
        self.inner.id()
    }

    fn handler(&self) -> &dyn SessionHandler {
        self.inner.handler()
    }

    fn start(&mut self) -> SessionResult<()> {
        let sealed = self.inner.handler().read(self.inner.id())?;
        if sealed.is_empty() {
            self.inner.load_payload(&[]);
            return Ok(());
        }

        match self.encrypter.decrypt(&sealed) {
            Ok(plain) => self.inner.load_payload(&plain),
            Err(e) => {
                log::warn!(
                    "Discarding session {} that failed to decrypt: {}",
                    self.inner.id(),
                    e
                );
                self.inner.load_payload(&[]);
            }
        }
        log::debug!("Started encrypted session {}", self.inner.id());
        Ok(())
    }

    fn save(&mut self) -> SessionResult<()> {
        let plain = self.inner.prepare_payload()?;
        let sealed = self.encrypter.encrypt(&plain)?;
        self.inner.handler().write(self.inner.id(), &sealed)?;
        log::debug!("Saved encrypted session {}", self.inner.id());
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    fn all(&self) -> Attributes {
        self.inner.all()
    }

    fn has(&self, key: &str) -> bool {
        self.inner.has(key)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: Value) {
        self.inner.put(key, value);
    }

    fn push(&mut self, key: &str, value: Value) {
        self.inner.push(key, value);
    }

    fn pull(&mut self, key: &str) -> Option<Value> {
        self.inner.pull(key)
    }

    fn forget(&mut self, key: &str) {
        self.inner.forget(key);
    }

    fn flush(&mut self) {
        self.inner.flush();
    }

    fn flash(&mut self, key: &str, value: Value) {
        self.inner.flash(key, value);
    }

    fn reflash(&mut self) {
        self.inner.reflash();
    }

    fn keep(&mut self, keys: &[&str]) {
        self.inner.keep(keys);
    }

    fn invalidate(&mut self) -> SessionResult<()> {
        self.inner.invalidate()
    }
}
