use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Derived key material has wrong length: expected {expected}, got {actual}")]
    DerivedKeyLength { expected: usize, actual: usize },

    #[error("Ciphertext too short to carry a MAC ({0} bytes)")]
    MacTooShort(usize),

    #[error("MAC mismatch (possible tampering)")]
    MacMismatch,

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (authentication tag mismatch)")]
    AeadDecrypt,

    #[error("Signature verification failed")]
    SignatureVerification,
}
