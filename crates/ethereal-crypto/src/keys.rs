//! Shared secrets: 256-bit random values carried as text
//!
//! Two flavors with different encodings and lifecycles:
//! - session secret: base64, issued by the service and kept in the session
//! - local secret: 64 hex chars, generated by the client per remote save and
//!   only ever embedded in the fragment identifier

use base64::Engine;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// A shared secret in its textual form. The text itself is the PBKDF2 input.
#[derive(Clone)]
pub struct SharedSecret(SecretString);

impl SharedSecret {
    pub fn new(text: impl Into<String>) -> Self {
        Self(SecretString::from(text.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn as_secret(&self) -> &SecretString {
        &self.0
    }
}

impl From<String> for SharedSecret {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

fn random_key_bytes() -> [u8; KEY_SIZE] {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a session secret: 32 random bytes, standard base64.
pub fn generate_session_secret() -> SharedSecret {
    let mut bytes = random_key_bytes();
    let text = base64::engine::general_purpose::STANDARD.encode(bytes);
    bytes.zeroize();
    SharedSecret::new(text)
}

/// Generate a local secret: 32 random bytes, lowercase hex (64 chars).
pub fn generate_local_secret() -> SharedSecret {
    let mut bytes = random_key_bytes();
    let text = hex::encode(bytes);
    bytes.zeroize();
    SharedSecret::new(text)
}
