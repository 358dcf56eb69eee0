//! Sealed-sender envelope and inner message content.
//!
//! Envelope wire format (the relay sees exactly this):
//!   [ version byte | ephemeral key (33) | len32 encrypted_static | len32 encrypted_message ]
//!
//! The version byte duplicates the protocol version into both nibbles,
//! `(version << 4) | version`. The duplication is an interoperability quirk
//! and must be reproduced byte-for-byte.
//!
//! `MessageContent` (inside the decrypted static layer) has no version
//! byte: a one-byte type discriminant, the sender certificate, and the
//! inner ciphertext.

use shroud_crypto::keys::SERIALIZED_KEY_LEN;
use shroud_crypto::PublicKey;

use crate::certificate::SenderCertificate;
use crate::error::ProtoError;
use crate::wire::{Reader, Writer};

/// Highest envelope version this build understands.
pub const CURRENT_VERSION: u8 = 1;

// ── Message type ─────────────────────────────────────────────────────────────

/// Kind of ciphertext carried inside the static layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Session-establishing ratchet message (consumes a prekey).
    PreKey,
    /// Ordinary ratchet message.
    Whisper,
    /// Sessionless single-shot fallback.
    Fallback,
}

impl MessageType {
    pub fn to_wire(self) -> u8 {
        match self {
            MessageType::PreKey => 1,
            MessageType::Whisper => 2,
            MessageType::Fallback => 3,
        }
    }

    pub fn from_wire(v: u8) -> Result<Self, ProtoError> {
        match v {
            1 => Ok(MessageType::PreKey),
            2 => Ok(MessageType::Whisper),
            3 => Ok(MessageType::Fallback),
            other => Err(ProtoError::UnknownMessageType(other)),
        }
    }
}

// ── Cipher message ───────────────────────────────────────────────────────────

/// Inner ciphertext plus its kind, as produced by the ratchet cipher or the
/// fallback cipher. Matched exhaustively at the decrypt dispatch point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherMessage {
    PreKey(Vec<u8>),
    Whisper(Vec<u8>),
    Fallback(Vec<u8>),
}

impl CipherMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            CipherMessage::PreKey(_) => MessageType::PreKey,
            CipherMessage::Whisper(_) => MessageType::Whisper,
            CipherMessage::Fallback(_) => MessageType::Fallback,
        }
    }

    pub fn content(&self) -> &[u8] {
        match self {
            CipherMessage::PreKey(c) | CipherMessage::Whisper(c) | CipherMessage::Fallback(c) => c,
        }
    }

    pub fn from_parts(message_type: MessageType, content: Vec<u8>) -> Self {
        match message_type {
            MessageType::PreKey => CipherMessage::PreKey(content),
            MessageType::Whisper => CipherMessage::Whisper(content),
            MessageType::Fallback => CipherMessage::Fallback(content),
        }
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// The outer wire object. Produced once per send, consumed once per
/// receive; all three fields are mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnidentifiedSenderMessage {
    pub ephemeral_key: PublicKey,
    pub encrypted_static: Vec<u8>,
    pub encrypted_message: Vec<u8>,
}

impl UnidentifiedSenderMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_u8((CURRENT_VERSION << 4) | CURRENT_VERSION)
            .put_raw(&self.ephemeral_key.serialize())
            .put_bytes(&self.encrypted_static)
            .put_bytes(&self.encrypted_message);
        w.finish()
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtoError> {
        let mut r = Reader::new(data);
        let version_byte = r
            .get_u8("version byte")
            .map_err(|_| ProtoError::MalformedEnvelope("empty envelope".into()))?;

        // Version gate comes first; nothing else is parsed for an unknown
        // version.
        let version = version_byte >> 4;
        if version > CURRENT_VERSION {
            return Err(ProtoError::UnsupportedVersion {
                found: version,
                max: CURRENT_VERSION,
            });
        }

        let ephemeral_key = PublicKey::deserialize(r.get_raw(SERIALIZED_KEY_LEN, "ephemeral key")?)
            .map_err(|e| ProtoError::MalformedEnvelope(e.to_string()))?;
        let encrypted_static = r.get_bytes("encrypted static")?.to_vec();
        let encrypted_message = r.get_bytes("encrypted message")?.to_vec();
        if encrypted_static.is_empty() || encrypted_message.is_empty() {
            return Err(ProtoError::MalformedEnvelope(
                "empty encrypted field".into(),
            ));
        }
        if !r.is_empty() {
            return Err(ProtoError::MalformedEnvelope(format!(
                "{} trailing bytes",
                r.remaining()
            )));
        }
        Ok(Self {
            ephemeral_key,
            encrypted_static,
            encrypted_message,
        })
    }
}

// ── Message content ──────────────────────────────────────────────────────────

/// Plaintext of the static layer: what the recipient sees after the second
/// box opens, and all it needs to dispatch the inner ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnidentifiedSenderMessageContent {
    pub message_type: MessageType,
    pub sender_certificate: SenderCertificate,
    pub content: Vec<u8>,
}

impl UnidentifiedSenderMessageContent {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_u8(self.message_type.to_wire())
            .put_bytes(&self.sender_certificate.encode())
            .put_bytes(&self.content);
        w.finish()
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtoError> {
        let mut r = Reader::new(data);
        let message_type = MessageType::from_wire(r.get_u8("message type")?)?;
        let sender_certificate = SenderCertificate::decode(r.get_bytes("sender certificate")?)?;
        let content = r.get_bytes("content")?.to_vec();
        if content.is_empty() {
            return Err(ProtoError::MalformedEnvelope("empty content".into()));
        }
        if !r.is_empty() {
            return Err(ProtoError::MalformedEnvelope(format!(
                "{} trailing bytes after message content",
                r.remaining()
            )));
        }
        Ok(Self {
            message_type,
            sender_certificate,
            content,
        })
    }
}
