//! Filesystem-backed session handler.
//!
//! Each session lives in its own file named after the session id inside a
//! configured directory. Writes go to a temp file in the same directory and
//! are renamed over the target, so readers never observe a half-written
//! payload. There is no locking: two requests saving the same session race
//! and the last rename wins.

use std::any::Any;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;

use crate::session::error::{SessionError, SessionResult};
use crate::session::handler::SessionHandler;

/// Maximum accepted session id length.
const MAX_ID_LEN: usize = 128;

/// Check that `id` is safe to use as a file name.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted, which rules out path
/// separators, `..` and NUL bytes.
#[must_use]
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Stores one file per session id under a directory.
#[derive(Debug, Clone)]
pub struct FileSessionHandler {
    path: PathBuf,
}

impl FileSessionHandler {
    /// Create a handler rooted at `path`. The directory is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The directory sessions are stored in.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn session_path(&self, id: &str) -> SessionResult<PathBuf> {
        if !is_valid_session_id(id) {
            return Err(SessionError::InvalidSessionId(id.to_string()));
        }
        Ok(self.path.join(id))
    }
}

impl SessionHandler for FileSessionHandler {
    fn read(&self, id: &str) -> SessionResult<Vec<u8>> {
        let path = self.session_path(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(SessionError::storage(&path, e)),
        }
    }

    fn write(&self, id: &str, payload: &[u8]) -> SessionResult<()> {
        let path = self.session_path(id)?;
        fs::create_dir_all(&self.path).map_err(|e| SessionError::storage(&self.path, e))?;

        let mut temp =
            NamedTempFile::new_in(&self.path).map_err(|e| SessionError::storage(&self.path, e))?;
        temp.write_all(payload)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| SessionError::storage(temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| SessionError::storage(&path, e.error))?;

        log::trace!("Wrote {} bytes to {}", payload.len(), path.display());
        Ok(())
    }

    fn destroy(&self, id: &str) -> SessionResult<()> {
        let path = self.session_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Destroyed session file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::storage(&path, e)),
        }
    }

    fn gc(&self, max_lifetime: Duration) -> SessionResult<usize> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(SessionError::storage(&self.path, e)),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", self.path.display(), e);
                    continue;
                }
            };
            let path = entry.path();

            let modified = match entry.metadata().and_then(|m| {
                if m.is_file() {
                    m.modified().map(Some)
                } else {
                    Ok(None)
                }
            }) {
                Ok(Some(modified)) => modified,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping {} during gc: {}", path.display(), e);
                    continue;
                }
            };

            let expired = now
                .duration_since(modified)
                .is_ok_and(|age| age > max_lifetime);
            if !expired {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    log::trace!("Removed expired session file {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        log::debug!(
            "Session gc removed {} file(s) from {}",
            removed,
            self.path.display()
        );
        Ok(removed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
