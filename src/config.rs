//! Application configuration management.
//!
//! Configuration is layered with figment, later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`Defaults`])
//! 2. A TOML file (`--config PATH`, or `config.toml` in the platform config dir)
//! 3. Environment variables prefixed with `LUMBERJACK_`, using `__` for nesting
//!    (`LUMBERJACK_SESSION__DRIVER=array`)
//!
//! Values are looked up by dotted key with [`Config::get`].
//!
//! # Example
//!
//! ```
//! use lumberjack_session::config::Config;
//!
//! let config = Config::defaults().with("session.driver", "array");
//! assert_eq!(config.get("session.driver", "file".to_string()), "array");
//! assert_eq!(config.get("session.cookie", String::new()), "lumberjack");
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "LUMBERJACK_";

/// Cookie name used when `session.cookie` is not configured.
pub const DEFAULT_COOKIE: &str = "lumberjack";

/// Driver used when `session.driver` is not configured.
pub const DEFAULT_DRIVER: &str = "file";

/// Session lifetime in minutes when `session.lifetime` is not configured.
pub const DEFAULT_LIFETIME_MINUTES: u64 = 120;

/// Built-in configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    pub app: AppDefaults,
    pub session: SessionDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppDefaults {
    /// Encryption key. Unset by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    pub driver: String,
    pub cookie: String,
    pub encrypt: bool,
    /// Minutes of inactivity before a session is garbage collected.
    pub lifetime: u64,
    /// Directory used by the `file` driver.
    pub files: PathBuf,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            app: AppDefaults::default(),
            session: SessionDefaults {
                driver: DEFAULT_DRIVER.to_string(),
                cookie: DEFAULT_COOKIE.to_string(),
                encrypt: false,
                lifetime: DEFAULT_LIFETIME_MINUTES,
                files: default_session_dir(),
            },
        }
    }
}

/// Default directory for file-backed sessions.
fn default_session_dir() -> PathBuf {
    ProjectDirs::from("com", "lumberjack", "lumberjack")
        .map(|dirs| dirs.data_dir().join("sessions"))
        .unwrap_or_else(|| std::env::temp_dir().join("lumberjack-sessions"))
}

/// Layered key/value configuration.
#[derive(Debug, Clone)]
pub struct Config {
    figment: Figment,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Built-in defaults only, ignoring files and environment.
    pub fn defaults() -> Self {
        Self::from_figment(Figment::from(Serialized::defaults(Defaults::default())))
    }

    /// Wrap an existing figment.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Load defaults, the platform config file (if any), then the environment.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from_path(path),
            None => {
                log::debug!("Could not determine config directory, using defaults and env");
                Self::from_figment(Self::base().merge(Self::env()))
            }
        }
    }

    /// Load defaults, the TOML file at `path`, then the environment.
    ///
    /// A missing file is skipped.
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        Self::from_figment(
            Self::base()
                .merge(Toml::file(path))
                .merge(Self::env()),
        )
    }

    /// Override a single dotted key.
    #[must_use]
    pub fn with(self, key: &str, value: impl Serialize) -> Self {
        Self {
            figment: self.figment.merge(Serialized::default(key, value)),
        }
    }

    /// Look up a dotted key, returning `default` if it is missing or the wrong type.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.figment.extract_inner::<T>(key) {
            Ok(value) => value,
            Err(e) => {
                if !e.missing() {
                    log::warn!("Ignoring invalid config value for {}: {}", key, e);
                }
                default
            }
        }
    }

    /// Look up a dotted key that has no meaningful default.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.figment.extract_inner::<T>(key).ok()
    }

    /// The underlying figment, for extracting whole sections.
    #[must_use]
    pub fn figment(&self) -> &Figment {
        &self.figment
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Defaults::default()))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Platform-specific configuration file path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "lumberjack", "lumberjack")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
