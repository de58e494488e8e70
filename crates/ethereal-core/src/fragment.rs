//! Fragment identifier codec
//!
//! A remote secret is addressed by `<remoteKey>;<localKey>`:
//! ```text
//! 0f8e4d62-5a41-4c39-9b0e-0d7f1c2a3b4c;<64 lowercase hex chars>
//! └──────────── remoteKey ───────────┘ └──────── localKey ───────┘
//! ```
//! Only `remoteKey` is ever sent to the server. `localKey` is the AEAD
//! secret and stays with whoever holds the identifier.

use std::fmt;
use std::str::FromStr;

use crate::error::{EtherealError, EtherealResult};

/// Length of the textual UUID form (8-4-4-4-12)
pub const UUID_LEN: usize = 36;

/// Length of the hex-encoded local secret (256 bits)
pub const LOCAL_KEY_LEN: usize = 64;

const SEPARATOR: char = ';';

/// A parsed `<remoteKey>;<localKey>` pair. Both halves are validated.
#[derive(Clone, PartialEq, Eq)]
pub struct FragmentIdentifier {
    remote_key: String,
    local_key: String,
}

impl FragmentIdentifier {
    /// Build an identifier from its parts, validating both.
    pub fn new(remote_key: &str, local_key: &str) -> EtherealResult<Self> {
        if !is_lower_uuid(remote_key) || !is_lower_hex(local_key, LOCAL_KEY_LEN) {
            return Err(invalid());
        }
        Ok(Self {
            remote_key: remote_key.to_string(),
            local_key: local_key.to_string(),
        })
    }

    /// Parse an identifier, matching `UUID ";" HEX64` over the whole input.
    pub fn parse(identifier: &str) -> EtherealResult<Self> {
        let (remote, local) = identifier.split_once(SEPARATOR).ok_or_else(invalid)?;
        Self::new(remote, local)
    }

    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    pub fn local_key(&self) -> &str {
        &self.local_key
    }
}

/// `remoteKey + ";" + localKey`, without validation.
pub fn format(remote_key: &str, local_key: &str) -> String {
    format!("{remote_key}{SEPARATOR}{local_key}")
}

impl FromStr for FragmentIdentifier {
    type Err = EtherealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FragmentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.remote_key, self.local_key)
    }
}

impl fmt::Debug for FragmentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentIdentifier")
            .field("remote_key", &self.remote_key)
            .field("local_key", &"[REDACTED]")
            .finish()
    }
}

fn invalid() -> EtherealError {
    EtherealError::Validation("Fragment identifier is invalid".into())
}

/// True if `s` has the 8-4-4-4-12 hex shape of a UUID (any case).
///
/// Used by the service to validate path keys before touching the store.
pub fn is_uuid(s: &str) -> bool {
    uuid_shape(s, |b| b.is_ascii_hexdigit())
}

fn is_lower_uuid(s: &str) -> bool {
    uuid_shape(s, is_lower_hex_digit)
}

fn uuid_shape(s: &str, is_digit: impl Fn(u8) -> bool) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == UUID_LEN
        && bytes.iter().enumerate().all(|(i, &b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            _ => is_digit(b),
        })
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(is_lower_hex_digit)
}

fn is_lower_hex_digit(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}
