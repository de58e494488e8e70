//! AES-256-GCM envelope encryption/decryption
//!
//! Serialized envelope (JSON, every field standard base64):
//! ```text
//! {"encrypted": ciphertext‖tag, "salt": 16 bytes, "iv": 12 bytes, "additionalData": 16 bytes}
//! ```
//! Salt, IV and additional data are fresh per call, so every envelope is
//! sealed under its own derived key and a (key, IV) pair is never reused.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use ethereal_core::{EtherealError, EtherealResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::kdf::{derive_key, KdfParams};
use crate::keys::SharedSecret;
use crate::{AAD_SIZE, IV_SIZE, SALT_SIZE, TAG_SIZE};

/// An encrypted payload with everything needed to decrypt it except the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "encrypted")]
    pub ciphertext: String,
    pub salt: String,
    pub iv: String,
    #[serde(rename = "additionalData")]
    pub additional_data: String,
}

impl Envelope {
    pub fn to_json(&self) -> EtherealResult<String> {
        serde_json::to_string(self)
            .map_err(|e| EtherealError::Other(anyhow::anyhow!("envelope serialization: {e}")))
    }

    /// Parse a serialized envelope. A structurally broken envelope cannot be
    /// authenticated, so it is reported as an authentication failure.
    pub fn from_json(json: &str) -> EtherealResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EtherealError::Authentication(format!("malformed envelope: {e}")))
    }
}

/// Envelope codec bound to a set of KDF parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    params: KdfParams,
}

impl Codec {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Encrypt `clear_text` under a key derived from `secret`.
    pub fn encrypt(&self, secret: &SharedSecret, clear_text: &str) -> EtherealResult<Envelope> {
        let salt: [u8; SALT_SIZE] = random_array();
        let iv: [u8; IV_SIZE] = random_array();
        let additional_data: [u8; AAD_SIZE] = random_array();

        let key = derive_key(secret.as_secret(), &salt, &self.params);
        let cipher = Aes256Gcm::new(key.as_bytes().into());

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: clear_text.as_bytes(),
                    aad: &additional_data,
                },
            )
            .map_err(|e| EtherealError::Other(anyhow::anyhow!("envelope encryption failed: {e}")))?;

        Ok(Envelope {
            ciphertext: STANDARD.encode(ciphertext),
            salt: STANDARD.encode(salt),
            iv: STANDARD.encode(iv),
            additional_data: STANDARD.encode(additional_data),
        })
    }

    /// Decrypt an envelope and verify its tag.
    ///
    /// Any failure (wrong secret, tampering, undecodable fields) is an
    /// `Authentication` error.
    pub fn decrypt(&self, secret: &SharedSecret, envelope: &Envelope) -> EtherealResult<String> {
        let salt: [u8; SALT_SIZE] = decode_fixed(&envelope.salt, "salt")?;
        let iv: [u8; IV_SIZE] = decode_fixed(&envelope.iv, "iv")?;
        let additional_data = decode_field(&envelope.additional_data, "additionalData")?;
        let ciphertext = decode_field(&envelope.ciphertext, "encrypted")?;

        if ciphertext.len() < TAG_SIZE {
            return Err(EtherealError::Authentication(format!(
                "ciphertext too short: {} bytes (minimum {TAG_SIZE})",
                ciphertext.len()
            )));
        }

        let key = derive_key(secret.as_secret(), &salt, &self.params);
        let cipher = Aes256Gcm::new(key.as_bytes().into());

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &ciphertext,
                    aad: &additional_data,
                },
            )
            .map_err(|_| {
                EtherealError::Authentication(
                    "decryption failed: wrong secret or corrupted data".into(),
                )
            })?;

        String::from_utf8(plaintext).map_err(|_| {
            EtherealError::Authentication("decrypted payload is not valid UTF-8".into())
        })
    }

    /// Encrypt and serialize in one step.
    pub fn seal(&self, secret: &SharedSecret, clear_text: &str) -> EtherealResult<String> {
        self.encrypt(secret, clear_text)?.to_json()
    }

    /// Parse and decrypt in one step.
    pub fn open(&self, secret: &SharedSecret, serialized: &str) -> EtherealResult<String> {
        self.decrypt(secret, &Envelope::from_json(serialized)?)
    }
}

/// Encrypt with the default PBKDF2 parameters.
pub fn encrypt(secret: &SharedSecret, clear_text: &str) -> EtherealResult<Envelope> {
    Codec::default().encrypt(secret, clear_text)
}

/// Decrypt with the default PBKDF2 parameters.
pub fn decrypt(secret: &SharedSecret, envelope: &Envelope) -> EtherealResult<String> {
    Codec::default().decrypt(secret, envelope)
}

fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn decode_field(value: &str, field: &str) -> EtherealResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| EtherealError::Authentication(format!("envelope field {field}: {e}")))
}

fn decode_fixed<const N: usize>(value: &str, field: &str) -> EtherealResult<[u8; N]> {
    let bytes = decode_field(value, field)?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        EtherealError::Authentication(format!(
            "envelope field {field}: {} bytes (expected {N})",
            b.len()
        ))
    })
}
