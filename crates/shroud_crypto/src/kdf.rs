//! Key schedule for the envelope layers.
//!
//! One HKDF-SHA256 derivation per layer: 96 bytes of output split into
//! three 32-byte parts in fixed order (chain key, cipher key, MAC key).
//! The chain key of the ephemeral layer seeds the salt of the static layer;
//! the static layer's own chain key is discarded.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroizing, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Total output of one derivation: three 32-byte subkeys.
pub const DERIVED_LEN: usize = 96;

/// Expand `shared_secret` + `salt` into `out_len` bytes of key material.
///
/// Both inputs must be non-empty. A length mismatch from the KDF is a
/// distinct error and is never silently truncated or padded.
pub fn derive_secrets(
    shared_secret: &[u8],
    salt: &[u8],
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if shared_secret.is_empty() {
        return Err(CryptoError::InvalidInput("empty shared secret".into()));
    }
    if salt.is_empty() {
        return Err(CryptoError::InvalidInput("empty salt".into()));
    }

    let hk = Hkdf::<Sha256>::new(Some(salt), shared_secret);
    let mut okm = Zeroizing::new(vec![0u8; out_len]);
    hk.expand(&[], okm.as_mut_slice())
        .map_err(|_| CryptoError::DerivedKeyLength {
            expected: out_len,
            actual: 0,
        })?;
    if okm.len() != out_len {
        return Err(CryptoError::DerivedKeyLength {
            expected: out_len,
            actual: okm.len(),
        });
    }
    Ok(okm)
}

// ── Derived key triples ──────────────────────────────────────────────────────

/// Subkeys of the ephemeral (outer) layer. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct EphemeralKeys {
    pub chain_key: [u8; 32],
    pub cipher_key: [u8; 32],
    pub mac_key: [u8; 32],
}

impl EphemeralKeys {
    pub fn derive(shared_secret: &[u8], salt: &[u8]) -> Result<Self, CryptoError> {
        let okm = derive_secrets(shared_secret, salt, DERIVED_LEN)?;
        let mut keys = Self {
            chain_key: [0u8; 32],
            cipher_key: [0u8; 32],
            mac_key: [0u8; 32],
        };
        keys.chain_key.copy_from_slice(&okm[..32]);
        keys.cipher_key.copy_from_slice(&okm[32..64]);
        keys.mac_key.copy_from_slice(&okm[64..]);
        Ok(keys)
    }
}

/// Subkeys of the static (inner) layer. The leading 32 bytes of the
/// derivation (the chain-key slot) are discarded. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct StaticKeys {
    pub cipher_key: [u8; 32],
    pub mac_key: [u8; 32],
}

impl StaticKeys {
    pub fn derive(shared_secret: &[u8], salt: &[u8]) -> Result<Self, CryptoError> {
        let okm = derive_secrets(shared_secret, salt, DERIVED_LEN)?;
        let mut keys = Self {
            cipher_key: [0u8; 32],
            mac_key: [0u8; 32],
        };
        keys.cipher_key.copy_from_slice(&okm[32..64]);
        keys.mac_key.copy_from_slice(&okm[64..]);
        Ok(keys)
    }
}
