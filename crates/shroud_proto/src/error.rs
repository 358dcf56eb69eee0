use shroud_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Unsupported envelope version {found} (max {max})")]
    UnsupportedVersion { found: u8, max: u8 },

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("Unknown message type discriminant {0}")]
    UnknownMessageType(u8),

    #[error("Truncated field: {0}")]
    Truncated(&'static str),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
