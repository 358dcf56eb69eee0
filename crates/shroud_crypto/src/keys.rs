//! Identity and ephemeral key material.
//!
//! One Ed25519 key pair serves both roles this protocol needs:
//!   - signing / verifying certificates (Ed25519)
//!   - Diffie-Hellman agreement for the envelope layers (converted to X25519)
//!
//! Conversion rules:
//!   - public half: birational map Ed25519 -> Curve25519 (Montgomery u)
//!   - secret half: SHA-512 expansion of the seed, clamped per RFC 7748 §5
//!
//! Serialized public form is `0x05 || 32 key bytes`; the private key is
//! never serialized with a type byte.

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Type tag prefixed to every serialized public key.
pub const KEY_TYPE_TAG: u8 = 0x05;

/// Raw key length (both public and private).
pub const KEY_LEN: usize = 32;

/// Serialized public key length (tag + raw bytes).
pub const SERIALIZED_KEY_LEN: usize = 33;

// ── Public key ───────────────────────────────────────────────────────────────

/// 32-byte Ed25519 public key. Equality and hashing are over the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: [u8; KEY_LEN],
}

impl PublicKey {
    /// Construct from raw key bytes (no type tag).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("Public key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self { bytes })
    }

    /// Parse the serialized form: `0x05 || 32 key bytes`.
    pub fn deserialize(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != SERIALIZED_KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "Serialized public key must be {} bytes, got {}",
                SERIALIZED_KEY_LEN,
                data.len()
            )));
        }
        if data[0] != KEY_TYPE_TAG {
            return Err(CryptoError::InvalidKey(format!(
                "Unknown key type tag 0x{:02x}",
                data[0]
            )));
        }
        Self::from_bytes(&data[1..])
    }

    /// Serialized form: `0x05 || 32 key bytes`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SERIALIZED_KEY_LEN);
        out.push(KEY_TYPE_TAG);
        out.extend_from_slice(&self.bytes);
        out
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Parse a recipient identifier: the serialized key, hex-encoded
    /// (66 chars beginning "05").
    pub fn from_hex_id(id: &str) -> Result<Self, CryptoError> {
        let data = hex::decode(id)
            .map_err(|e| CryptoError::InvalidKey(format!("Bad hex recipient id: {e}")))?;
        Self::deserialize(&data)
    }

    /// Recipient identifier form: hex of the serialized key.
    pub fn to_hex_id(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Human-readable fingerprint: BLAKE3 of the raw key, truncated to
    /// 20 bytes, hex-encoded in groups of 4 for display.
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(&self.bytes);
        let hex = hex::encode(&hash.as_bytes()[..20]);
        hex.chars()
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|c| c.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Verify a 64-byte Ed25519 signature made by this key.
    pub fn verify(&self, msg: &[u8], sig_bytes: &[u8]) -> Result<(), CryptoError> {
        let vk = VerifyingKey::from_bytes(&self.bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let sig = Signature::from_bytes(
            sig_bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKey("Bad signature length".into()))?,
        );
        vk.verify(msg, &sig)
            .map_err(|_| CryptoError::SignatureVerification)
    }

    /// Convert to an X25519 public key for Diffie-Hellman.
    pub fn to_x25519(&self) -> Result<X25519Public, CryptoError> {
        let compressed = CompressedEdwardsY::from_slice(&self.bytes)
            .map_err(|_| CryptoError::InvalidKey("invalid Ed25519 public key".into()))?;
        let point = compressed.decompress().ok_or_else(|| {
            CryptoError::InvalidKey("Ed25519 public key decompression failed".into())
        })?;
        Ok(X25519Public::from(point.to_montgomery().to_bytes()))
    }
}

// ── Private key ──────────────────────────────────────────────────────────────

/// 32-byte Ed25519 seed. Zeroized on drop; no serialized type tag exists.
#[derive(Clone, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; KEY_LEN],
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("Private key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Sign arbitrary bytes; returns the 64-byte raw Ed25519 signature.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        SigningKey::from_bytes(&self.bytes)
            .sign(msg)
            .to_bytes()
            .to_vec()
    }

    /// Convert to an X25519 static secret for Diffie-Hellman.
    /// Uses the clamped SHA-512 expansion that ed25519-dalek uses internally.
    pub fn to_x25519(&self) -> StaticSecret {
        let mut h = Sha512::digest(self.bytes);
        // Clamp as per RFC 7748 §5
        h[0] &= 248;
        h[31] &= 127;
        h[31] |= 64;
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&h[..KEY_LEN]);
        h.as_mut_slice().zeroize();
        StaticSecret::from(key)
    }
}

// ── Key pair ─────────────────────────────────────────────────────────────────

/// An identity (or ephemeral) key pair.
#[derive(Clone)]
pub struct KeyPair {
    pub public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public = PublicKey {
            bytes: signing_key.verifying_key().to_bytes(),
        };
        let private = PrivateKey {
            bytes: signing_key.to_bytes(),
        };
        Self { public, private }
    }

    pub fn from_private(private: PrivateKey) -> Self {
        let signing_key = SigningKey::from_bytes(private.as_bytes());
        let public = PublicKey {
            bytes: signing_key.verifying_key().to_bytes(),
        };
        Self { public, private }
    }

    pub fn private(&self) -> &PrivateKey {
        &self.private
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.private.sign(msg)
    }
}

// ── Agreement ────────────────────────────────────────────────────────────────

/// X25519 shared secret between `private` and `public`.
pub fn agree(private: &PrivateKey, public: &PublicKey) -> Result<[u8; 32], CryptoError> {
    let scalar = private.to_x25519();
    let point = public.to_x25519()?;
    Ok(*scalar.diffie_hellman(&point).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_roundtrip_carries_type_tag() {
        let pair = KeyPair::generate();
        let ser = pair.public.serialize();
        assert_eq!(ser.len(), SERIALIZED_KEY_LEN);
        assert_eq!(ser[0], KEY_TYPE_TAG);
        let back = PublicKey::deserialize(&ser).unwrap();
        assert_eq!(back, pair.public);
    }

    #[test]
    fn rejects_wrong_length_and_wrong_tag() {
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
        assert!(PrivateKey::from_bytes(&[0u8; 33]).is_err());
        let pair = KeyPair::generate();
        let mut ser = pair.public.serialize();
        ser[0] = 0x06;
        assert!(PublicKey::deserialize(&ser).is_err());
    }

    #[test]
    fn hex_id_roundtrip() {
        let pair = KeyPair::generate();
        let id = pair.public.to_hex_id();
        assert!(id.starts_with("05"));
        assert_eq!(id.len(), 66);
        assert_eq!(PublicKey::from_hex_id(&id).unwrap(), pair.public);
    }

    #[test]
    fn agreement_is_symmetric() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let ab = agree(a.private(), &b.public).unwrap();
        let ba = agree(b.private(), &a.public).unwrap();
        assert_eq!(ab, ba);
        let c = KeyPair::generate();
        let ac = agree(a.private(), &c.public).unwrap();
        assert_ne!(ab, ac);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let pair = KeyPair::generate();
        let sig = pair.sign(b"certified bytes");
        pair.public.verify(b"certified bytes", &sig).unwrap();
        assert!(pair.public.verify(b"other bytes", &sig).is_err());
    }
}
