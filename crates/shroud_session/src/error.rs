use shroud_crypto::CryptoError;
use shroud_proto::ProtoError;
use thiserror::Error;

use crate::trust::CertificateError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing local identity key pair")]
    MissingIdentityKey,

    /// Distinguished non-fatal condition: the envelope's sender certificate
    /// names the local recipient and device. Callers silently discard.
    #[error("Message is self-sent")]
    SelfSentMessage,

    #[error("Invalid sender device id {0}")]
    InvalidSenderDeviceId(u32),

    /// The sender identity was already recovered when a later check failed,
    /// so the rejected message can still be attributed.
    #[error("Message from {sender_recipient_id} (device {sender_device_id}) rejected: {source}")]
    KnownSender {
        sender_recipient_id: String,
        sender_device_id: u32,
        #[source]
        source: Box<SessionError>,
    },

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("Ratchet cipher failed: {0}")]
    Ratchet(String),

    #[error("Session state error: {0}")]
    SessionState(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl SessionError {
    /// Wrap an error with the sender identifiers recovered before it.
    pub fn known_sender(
        sender_recipient_id: impl Into<String>,
        sender_device_id: u32,
        source: SessionError,
    ) -> Self {
        SessionError::KnownSender {
            sender_recipient_id: sender_recipient_id.into(),
            sender_device_id,
            source: Box::new(source),
        }
    }
}
