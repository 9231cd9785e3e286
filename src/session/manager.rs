//! Driver registry and store factory.
//!
//! [`SessionManager`] turns configuration into ready-to-use session stores.
//! Built-in drivers are `file`, `array` (in-memory) and `null`; applications
//! add their own backends with [`SessionManager::extend`]. Stores are built
//! once per driver name and shared afterwards.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::config::{self, Config};
use crate::encrypter::{AesEncrypter, Encrypter};
use crate::session::encrypted::EncryptedStore;
use crate::session::error::{SessionError, SessionResult};
use crate::session::file::FileSessionHandler;
use crate::session::handler::{MemorySessionHandler, NullSessionHandler, SessionHandler};
use crate::session::store::{SessionStore, Store};

/// Zero-argument constructor for a custom handler.
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn SessionHandler> + Send + Sync>;

/// A driver handed out by the manager, shared between callers.
pub type SharedDriver = Arc<Mutex<SessionDriver>>;

/// A store built by the manager: plain or encrypted.
#[derive(Debug)]
pub enum SessionDriver {
    Plain(Store),
    Encrypted(EncryptedStore),
}

impl SessionDriver {
    /// Whether the payload is encrypted at rest.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

impl std::ops::Deref for SessionDriver {
    type Target = dyn SessionStore;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Plain(store) => store,
            Self::Encrypted(store) => store,
        }
    }
}

impl std::ops::DerefMut for SessionDriver {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Plain(store) => store,
            Self::Encrypted(store) => store,
        }
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generate a fresh session id.
#[must_use]
pub fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Resolves configured session drivers and caches them by name.
pub struct SessionManager {
    config: Config,
    encrypter: Option<Arc<dyn Encrypter>>,
    session_id: Option<String>,
    custom: Mutex<HashMap<String, HandlerFactory>>,
    drivers: Mutex<HashMap<String, SharedDriver>>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<String> = lock(&self.custom).keys().cloned().collect();
        custom.sort();
        let mut drivers: Vec<String> = lock(&self.drivers).keys().cloned().collect();
        drivers.sort();
        f.debug_struct("SessionManager")
            .field("custom", &custom)
            .field("drivers", &drivers)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            encrypter: None,
            session_id: None,
            custom: Mutex::new(HashMap::new()),
            drivers: Mutex::new(HashMap::new()),
        }
    }

    /// Use `encrypter` for encrypted stores instead of deriving one from `app.key`.
    #[must_use]
    pub fn with_encrypter(mut self, encrypter: Arc<dyn Encrypter>) -> Self {
        self.encrypter = Some(encrypter);
        self
    }

    /// Use an id resolved elsewhere (e.g. from a cookie) instead of generating one.
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configured default driver name.
    #[must_use]
    pub fn default_driver(&self) -> String {
        self.config
            .get("session.driver", config::DEFAULT_DRIVER.to_string())
    }

    /// Register a custom handler factory under `name`.
    ///
    /// Custom drivers take precedence over built-ins of the same name. Stores
    /// already cached under `name` are not rebuilt.
    ///
    /// The factory runs without the registry lock, so it may call
    /// [`extend`](Self::extend) or [`handler`](Self::handler) on this
    /// manager. It must not call [`driver`](Self::driver): the driver cache
    /// stays locked while a store is being built.
    pub fn extend<F, H>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: SessionHandler,
    {
        let name = name.into();
        log::debug!("Registering custom session driver [{}]", name);
        let factory: HandlerFactory =
            Arc::new(move || -> Arc<dyn SessionHandler> { Arc::new(factory()) });
        lock(&self.custom).insert(name, factory);
    }

    /// Return the store for `name`, or for the default driver when `None`.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::UnknownDriver`] when nothing is registered
    /// under the name, and [`SessionError::MissingEncryptionKey`] when
    /// encryption is on but no key is available.
    pub fn driver(&self, name: Option<&str>) -> SessionResult<SharedDriver> {
        let name = name.map_or_else(|| self.default_driver(), str::to_string);

        // Held across construction so a name is never built twice
        let mut drivers = lock(&self.drivers);
        if let Some(driver) = drivers.get(&name) {
            return Ok(Arc::clone(driver));
        }

        let driver = Arc::new(Mutex::new(self.create_driver(&name)?));
        drivers.insert(name, Arc::clone(&driver));
        Ok(driver)
    }

    /// Build the handler behind driver `name` without a store.
    pub fn handler(&self, name: Option<&str>) -> SessionResult<Arc<dyn SessionHandler>> {
        let name = name.map_or_else(|| self.default_driver(), str::to_string);
        self.create_handler(&name)
    }

    fn create_handler(&self, name: &str) -> SessionResult<Arc<dyn SessionHandler>> {
        let custom = lock(&self.custom).get(name).cloned();
        if let Some(factory) = custom {
            return Ok(factory());
        }

        match name {
            "file" => {
                let fallback = config::Defaults::default().session.files;
                let path: PathBuf = self.config.get("session.files", fallback);
                Ok(Arc::new(FileSessionHandler::new(path)))
            }
            "array" => Ok(Arc::new(MemorySessionHandler::new())),
            "null" => Ok(Arc::new(NullSessionHandler)),
            _ => Err(SessionError::UnknownDriver(name.to_string())),
        }
    }

    fn create_driver(&self, name: &str) -> SessionResult<SessionDriver> {
        let handler = self.create_handler(name)?;
        let cookie: String = self
            .config
            .get("session.cookie", config::DEFAULT_COOKIE.to_string());
        let id = self
            .session_id
            .clone()
            .unwrap_or_else(generate_session_id);
        let store = Store::new(cookie, handler, id);

        if !self.config.get("session.encrypt", false) {
            log::debug!("Built session driver [{}]", name);
            return Ok(SessionDriver::Plain(store));
        }

        let encrypter = self.resolve_encrypter()?;
        log::debug!("Built encrypted session driver [{}]", name);
        Ok(SessionDriver::Encrypted(EncryptedStore::new(store, encrypter)))
    }

    fn resolve_encrypter(&self) -> SessionResult<Arc<dyn Encrypter>> {
        if let Some(encrypter) = &self.encrypter {
            return Ok(Arc::clone(encrypter));
        }

        let key: String = self
            .config
            .get_opt("app.key")
            .ok_or(SessionError::MissingEncryptionKey)?;
        Ok(Arc::new(AesEncrypter::new(&key)?))
    }
}
