//! Unidentified-delivery access key.
//!
//! A 16-byte admission token derived deterministically from a shared
//! 32-byte profile key: AES-256-GCM over sixteen zero bytes with a zero
//! nonce, truncated to the first 16 ciphertext bytes (the tag is dropped).
//! The token gates delivery at the relay; it plays no part in envelope
//! confidentiality.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

/// Token length on the wire.
pub const ACCESS_KEY_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct AccessKey {
    bytes: [u8; ACCESS_KEY_LEN],
}

impl AccessKey {
    /// Derive the token from a 32-byte profile key.
    pub fn derive(profile_key: &[u8; 32]) -> Result<Self, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(profile_key)
            .map_err(|_| CryptoError::InvalidKey("Bad profile key length".into()))?;
        let zero_nonce = Nonce::from_slice(&[0u8; 12]);
        let ciphertext = cipher
            .encrypt(zero_nonce, &[0u8; ACCESS_KEY_LEN][..])
            .map_err(|_| CryptoError::AeadEncrypt)?;
        if ciphertext.len() < ACCESS_KEY_LEN {
            return Err(CryptoError::DerivedKeyLength {
                expected: ACCESS_KEY_LEN,
                actual: ciphertext.len(),
            });
        }
        let mut bytes = [0u8; ACCESS_KEY_LEN];
        bytes.copy_from_slice(&ciphertext[..ACCESS_KEY_LEN]);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; ACCESS_KEY_LEN] {
        &self.bytes
    }
}

/// Tokens are compared by relays; keep the comparison constant-time.
impl PartialEq for AccessKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).unwrap_u8() == 1
    }
}

impl Eq for AccessKey {}
