//! Session module for per-user state persisted between requests.
//!
//! # Features
//!
//! * **Pluggable storage**: any [`SessionHandler`] can back a store; `file`,
//!   `array` and `null` are built in, others are added with
//!   [`SessionManager::extend`].
//! * **Flash data**: values visible for the current and the next lifecycle only.
//! * **Encryption at rest**: [`EncryptedStore`] seals the payload transparently.
//! * **Integrity**: payloads are wrapped in a versioned envelope with a SHA256 checksum.
//!
//! # Architecture
//!
//! * [`handler`]: the storage contract plus in-memory and null handlers.
//! * [`file`]: one file per session on disk.
//! * [`codec`]: canonical payload encoding.
//! * [`store`]: attribute state and flash aging.
//! * [`encrypted`]: encrypting decorator around [`Store`].
//! * [`manager`]: configuration-driven driver registry.
//!
//! # Concurrency
//!
//! A store serves one lifecycle and is not meant to be mutated concurrently.
//! Overlapping requests for the same session id are last-write-wins.
//!
//! # Example
//!
//! ```
//! use lumberjack_session::config::Config;
//! use lumberjack_session::session::{lock, SessionManager, SessionStore};
//! use serde_json::json;
//!
//! let manager = SessionManager::new(Config::defaults().with("session.driver", "array"));
//! let driver = manager.driver(None).unwrap();
//! let mut session = lock(&driver);
//!
//! session.start().unwrap();
//! session.flash("status", json!("Profile updated"));
//! session.save().unwrap();
//! assert_eq!(session.get("status"), Some(&json!("Profile updated")));
//! ```

pub mod codec;
pub mod encrypted;
pub mod error;
pub mod file;
pub mod handler;
pub mod manager;
pub mod store;

pub use codec::{Attributes, PAYLOAD_VERSION};
pub use encrypted::EncryptedStore;
pub use error::{SessionError, SessionResult};
pub use file::FileSessionHandler;
pub use handler::{MemorySessionHandler, NullSessionHandler, SessionHandler};
pub use manager::{generate_session_id, lock, SessionDriver, SessionManager, SharedDriver};
pub use store::{SessionStore, Store};
