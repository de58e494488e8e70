//! Key derivation: shared secret + salt → AES-256 key via PBKDF2-HMAC-SHA256

use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// A 256-bit key derived for a single envelope. Zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// HMAC-SHA256 rounds (default: 100000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

/// Derive a 256-bit key from `secret` and `salt`.
///
/// The salt is random per envelope and stored alongside it; it does not
/// need to be secret.
pub fn derive_key(secret: &SecretString, salt: &[u8; SALT_SIZE], params: &KdfParams) -> DerivedKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        secret.expose_secret().as_bytes(),
        salt,
        params.iterations,
        &mut key,
    );
    DerivedKey::from_bytes(key)
}
