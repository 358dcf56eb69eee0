//! Sessionless single-shot cipher.
//!
//! Used only when no ratchet session exists yet. One symmetric key is
//! derived from `ECDH(local private, peer identity public)` and reused for
//! the whole exchange: there is NO forward secrecy on this path. Callers
//! must prefer the ratchet path whenever a session is available.
//!
//! Ciphertext wire format: [ nonce (12 bytes) | AES-256-GCM ciphertext + tag ]

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use shroud_crypto::kdf::derive_secrets;
use shroud_crypto::{agree, CryptoError, PrivateKey, PublicKey};
use zeroize::ZeroizeOnDrop;

use crate::error::SessionError;

const NONCE_LEN: usize = 12;
const KEY_LABEL: &[u8] = b"sealed-sender-fallback-v1";

/// Degenerate pre-session cipher keyed once per peer. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct FallbackCipher {
    key: [u8; 32],
}

impl FallbackCipher {
    /// Derive the shared key for one peer. Symmetric in the two parties:
    /// each side passes its own private key and the other's identity key.
    pub fn new(local_private: &PrivateKey, peer: &PublicKey) -> Result<Self, SessionError> {
        let shared = agree(local_private, peer)?;
        let okm = derive_secrets(&shared, KEY_LABEL, 32)?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&okm);
        Ok(Self { key })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|_| SessionError::Crypto(CryptoError::AeadEncrypt))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| SessionError::Crypto(CryptoError::AeadEncrypt))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SessionError> {
        if data.len() < NONCE_LEN {
            return Err(SessionError::Crypto(CryptoError::AeadDecrypt));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|_| SessionError::Crypto(CryptoError::AeadDecrypt))?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SessionError::Crypto(CryptoError::AeadDecrypt))
    }
}
