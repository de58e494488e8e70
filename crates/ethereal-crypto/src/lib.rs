//! ethereal-crypto: the envelope codec shared by the client and its tests
//!
//! Every encryption derives a fresh key from the shared secret:
//! ```text
//! secret (session or local) ──PBKDF2-HMAC-SHA256, 100k rounds, random 16-byte salt──▶ 256-bit key
//! key + random 12-byte IV + random 16-byte AAD ──AES-256-GCM (128-bit tag)──▶ ciphertext‖tag
//! ```
//! The result is carried as a JSON [`Envelope`] with base64 fields.

pub mod envelope;
pub mod kdf;
pub mod keys;

pub use envelope::{decrypt, encrypt, Codec, Envelope};
pub use kdf::{derive_key, DerivedKey, KdfParams};
pub use keys::{generate_local_secret, generate_session_secret, SharedSecret};

/// Size of a derived AES-256 key and of a shared secret's entropy (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM IV (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of the PBKDF2 salt
pub const SALT_SIZE: usize = 16;

/// Size of the random associated data bound into each envelope
pub const AAD_SIZE: usize = 16;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// PBKDF2 rounds used unless a codec is built with other parameters
pub const PBKDF2_ITERATIONS: u32 = 100_000;
