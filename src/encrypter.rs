//! Symmetric encryption for session payloads at rest.
//!
//! The [`Encrypter`] trait is the seam stores depend on; [`AesEncrypter`] is
//! the built-in implementation using AES-256-GCM. Ciphertext is emitted as
//! base64 of `nonce || ciphertext || tag` so it can live in text files and
//! survive copy/paste.
//!
//! # Keys
//!
//! Keys are read from `app.key`. A key prefixed with `base64:` is decoded and
//! must be exactly 32 bytes; any other string is stretched with SHA-256.
//!
//! ```
//! use lumberjack_session::encrypter::{AesEncrypter, Encrypter};
//!
//! let encrypter = AesEncrypter::new("encryption-key").unwrap();
//! let sealed = encrypter.encrypt(b"hello").unwrap();
//! assert_eq!(encrypter.decrypt(&sealed).unwrap(), b"hello");
//! ```

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of the AES-GCM nonce prepended to every ciphertext.
const NONCE_LEN: usize = 12;

/// Length of an AES-256 key in bytes.
const KEY_LEN: usize = 32;

/// Error type for encryption operations.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The configured key is unusable.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// The cipher refused to seal the payload.
    #[error("failed to encrypt payload")]
    EncryptFailed,

    /// The payload is not valid ciphertext, or was produced with another key.
    #[error("the payload is invalid or has been tampered with")]
    InvalidPayload,
}

/// Byte-level encryption capability used by encrypted session stores.
pub trait Encrypter: Send + Sync {
    /// Encrypt `plaintext`, returning an opaque ciphertext.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError>;

    /// Decrypt a ciphertext produced by [`Encrypter::encrypt`].
    ///
    /// # Errors
    ///
    /// Fails with [`EncryptionError::InvalidPayload`] on malformed or
    /// tampered input.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError>;
}

/// AES-256-GCM encrypter.
pub struct AesEncrypter {
    cipher: Aes256Gcm,
}

impl AesEncrypter {
    /// Create an encrypter from an application key.
    pub fn new(key: &str) -> Result<Self, EncryptionError> {
        let key_bytes = derive_key(key)?;
        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| EncryptionError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }
}

impl std::fmt::Debug for AesEncrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesEncrypter").finish_non_exhaustive()
    }
}

impl Encrypter for AesEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| EncryptionError::EncryptFailed)?;

        let mut raw = Vec::with_capacity(NONCE_LEN + sealed.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&sealed);
        Ok(STANDARD.encode(raw).into_bytes())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let raw = STANDARD
            .decode(ciphertext.trim_ascii())
            .map_err(|_| EncryptionError::InvalidPayload)?;
        if raw.len() <= NONCE_LEN {
            return Err(EncryptionError::InvalidPayload);
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| EncryptionError::InvalidPayload)
    }
}

/// Turn an application key into 32 bytes of key material.
fn derive_key(key: &str) -> Result<Vec<u8>, EncryptionError> {
    if key.is_empty() {
        return Err(EncryptionError::InvalidKey("key is empty".to_string()));
    }

    if let Some(encoded) = key.strip_prefix("base64:") {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| EncryptionError::InvalidKey(e.to_string()))?;
        if bytes.len() != KEY_LEN {
            return Err(EncryptionError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        return Ok(bytes);
    }

    Ok(Sha256::digest(key.as_bytes()).to_vec())
}
