//! shroud_crypto - Shroud sealed-sender cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize derived and secret material on drop.
//! - MAC comparisons are constant-time; no plaintext escapes a failed check.
//!
//! # Module layout
//! - `keys`       - Ed25519 key pairs + X25519 conversions, 0x05-tagged wire form
//! - `kdf`        - HKDF-SHA256 key schedule (chain / cipher / MAC triples)
//! - `sealed_box` - AES-256-CTR + truncated-HMAC authenticated box
//! - `access_key` - 16-byte unidentified-delivery admission token
//! - `error`      - unified error type

pub mod access_key;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod sealed_box;

pub use error::CryptoError;
pub use keys::{agree, KeyPair, PrivateKey, PublicKey};
