//! MAC-then-decrypt authenticated box for the two envelope layers.
//!
//! Encrypts with AES-256-CTR under an all-zero 16-byte IV, then appends an
//! HMAC-SHA256 tag over the ciphertext, truncated to 10 bytes.
//!
//! Wire format: [ ciphertext | truncated MAC (10 bytes) ]
//!
//! The zero IV is sound ONLY because every cipher key is freshly derived
//! and used for exactly one seal call. Keys must never be reused.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

type Aes256Ctr = Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Truncated MAC length appended to every sealed box.
pub const MAC_LEN: usize = 10;

const ZERO_IV: [u8; 16] = [0u8; 16];

fn hmac_tag(mac_key: &[u8; 32], data: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(mac_key)
        .map_err(|_| CryptoError::InvalidKey("Bad HMAC key length".into()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Encrypt and tag. Output = ciphertext || MAC[..10].
pub fn seal(
    cipher_key: &[u8; 32],
    mac_key: &[u8; 32],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut out = plaintext.to_vec();
    let mut cipher = Aes256Ctr::new_from_slices(cipher_key, &ZERO_IV)
        .map_err(|_| CryptoError::InvalidKey("Bad AES key length".into()))?;
    cipher.apply_keystream(&mut out);

    let tag = hmac_tag(mac_key, &out)?;
    out.extend_from_slice(&tag[..MAC_LEN]);
    Ok(out)
}

/// Verify the tag in constant time, then decrypt.
///
/// The plaintext is never touched before the MAC check passes; a mismatch
/// yields `MacMismatch` with no partial output.
pub fn open(
    cipher_key: &[u8; 32],
    mac_key: &[u8; 32],
    input: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if input.len() < MAC_LEN {
        return Err(CryptoError::MacTooShort(input.len()));
    }
    let (ciphertext, their_mac) = input.split_at(input.len() - MAC_LEN);

    let our_tag = hmac_tag(mac_key, ciphertext)?;
    if our_tag[..MAC_LEN].ct_eq(their_mac).unwrap_u8() != 1 {
        return Err(CryptoError::MacMismatch);
    }

    let mut out = ciphertext.to_vec();
    let mut cipher = Aes256Ctr::new_from_slices(cipher_key, &ZERO_IV)
        .map_err(|_| CryptoError::InvalidKey("Bad AES key length".into()))?;
    cipher.apply_keystream(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> ([u8; 32], [u8; 32]) {
        ([0x11u8; 32], [0x22u8; 32])
    }

    #[test]
    fn seal_open_roundtrip() {
        let (ck, mk) = keys();
        let sealed = seal(&ck, &mk, b"inner message bytes").unwrap();
        assert_eq!(sealed.len(), b"inner message bytes".len() + MAC_LEN);
        let opened = open(&ck, &mk, &sealed).unwrap();
        assert_eq!(opened, b"inner message bytes");
    }

    #[test]
    fn empty_plaintext_still_tagged() {
        let (ck, mk) = keys();
        let sealed = seal(&ck, &mk, b"").unwrap();
        assert_eq!(sealed.len(), MAC_LEN);
        assert_eq!(open(&ck, &mk, &sealed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn too_short_input_is_rejected_before_any_work() {
        let (ck, mk) = keys();
        let err = open(&ck, &mk, &[0u8; MAC_LEN - 1]).unwrap_err();
        assert!(matches!(err, CryptoError::MacTooShort(9)));
    }

    #[test]
    fn every_single_byte_flip_fails_authentication() {
        let (ck, mk) = keys();
        let sealed = seal(&ck, &mk, b"flip me anywhere and I must die").unwrap();
        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            let err = open(&ck, &mk, &tampered).unwrap_err();
            assert!(
                matches!(err, CryptoError::MacMismatch),
                "byte {i} flip must fail the MAC, got {err:?}"
            );
        }
    }

    #[test]
    fn wrong_mac_key_fails() {
        let (ck, mk) = keys();
        let sealed = seal(&ck, &mk, b"payload").unwrap();
        let err = open(&ck, &[0x33u8; 32], &sealed).unwrap_err();
        assert!(matches!(err, CryptoError::MacMismatch));
    }

    #[test]
    fn many_wrong_tags_all_take_the_same_failure_branch() {
        // Structural stand-in for the timing property: a correct tag and
        // tags differing in the first, middle, and last byte must all be
        // classified by the single constant-time comparison.
        let (ck, mk) = keys();
        let sealed = seal(&ck, &mk, b"constant time").unwrap();
        let base = sealed.len() - MAC_LEN;
        for pos in [0, MAC_LEN / 2, MAC_LEN - 1] {
            let mut tampered = sealed.clone();
            tampered[base + pos] ^= 0x80;
            assert!(matches!(
                open(&ck, &mk, &tampered).unwrap_err(),
                CryptoError::MacMismatch
            ));
        }
        assert!(open(&ck, &mk, &sealed).is_ok());
    }
}
