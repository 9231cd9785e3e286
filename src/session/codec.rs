//! Canonical encoding of session payloads.
//!
//! Payloads are wrapped in a versioned envelope carrying a SHA256 checksum of
//! the compact payload JSON as written. Attribute maps are ordered, so the same session
//! state always encodes to the same bytes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Current version of the session payload format.
pub const PAYLOAD_VERSION: u32 = 1;

/// Session attributes keyed by name.
pub type Attributes = BTreeMap<String, Value>;

/// Why a payload could not be decoded.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed session envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported session payload version: {found} (current is {current})")]
    UnsupportedVersion { found: u32, current: u32 },

    #[error("session integrity check failed: checksum mismatch")]
    ChecksumMismatch,
}

/// Flash bookkeeping persisted next to the attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashKeys {
    /// Keys flashed during the current lifecycle.
    #[serde(default)]
    pub new: BTreeSet<String>,
    /// Keys flashed during the previous lifecycle.
    #[serde(default)]
    pub old: BTreeSet<String>,
}

/// Everything a store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub attributes: Attributes,
    #[serde(default)]
    pub flash: FlashKeys,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    payload: Box<RawValue>,
}

fn checksum(raw: &RawValue) -> String {
    format!("{:x}", Sha256::digest(raw.get().as_bytes()))
}

/// Encode a payload into its canonical byte form.
pub fn encode(payload: &SessionPayload) -> Result<Vec<u8>, serde_json::Error> {
    let raw = serde_json::value::to_raw_value(payload)?;
    let envelope = Envelope {
        version: PAYLOAD_VERSION,
        checksum: checksum(&raw),
        payload: raw,
    };
    serde_json::to_vec(&envelope)
}

/// Decode bytes produced by [`encode`], verifying version and checksum.
///
/// The checksum covers the payload bytes exactly as stored, so the check
/// does not depend on how numbers print after a parse.
pub fn decode(bytes: &[u8]) -> Result<SessionPayload, CodecError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;

    if envelope.version != PAYLOAD_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: envelope.version,
            current: PAYLOAD_VERSION,
        });
    }

    if checksum(&envelope.payload) != envelope.checksum {
        return Err(CodecError::ChecksumMismatch);
    }

    Ok(serde_json::from_str(envelope.payload.get())?)
}

/// Encode a bare attribute map with no flash bookkeeping.
pub fn encode_attributes(attributes: &Attributes) -> Result<Vec<u8>, serde_json::Error> {
    encode(&SessionPayload {
        attributes: attributes.clone(),
        flash: FlashKeys::default(),
    })
}
