//! The sealed-sender envelope cipher.
//!
//! Encryption wraps the inner ciphertext twice:
//!   1. an ephemeral layer keyed from a fresh key pair and the recipient's
//!      identity key, which seals the sender's identity key bytes, then
//!   2. a static layer keyed from both identity keys, which seals the
//!      message content (type + sender certificate + inner ciphertext).
//!
//! The relay forwarding the envelope learns neither the sender's identity
//! key nor the plaintext. Only the recipient, holding its identity private
//! key, can derive the ephemeral layer, recover the sender identity, and
//! then derive the static layer.
//!
//! Decryption opens strictly outer-to-inner; nothing is surfaced to the
//! caller until both MACs have verified. Once the sender identity is
//! known, later failures (certificate, device id, inner decrypt) are
//! wrapped with the sender identifiers so callers can attribute the
//! rejected message.

use tracing::{debug, info, warn};

use shroud_crypto::kdf::{EphemeralKeys, StaticKeys};
use shroud_crypto::{agree, sealed_box, KeyPair, PublicKey};
use shroud_proto::{
    CipherMessage, MessageType, SenderCertificate, UnidentifiedSenderMessage,
    UnidentifiedSenderMessageContent,
};

use crate::error::SessionError;
use crate::fallback::FallbackCipher;
use crate::reset::SessionResetCoordinator;
use crate::stores::{ProtocolStore, RatchetCipher, ResetDelegate};
use crate::trust::CertificateValidator;

/// Domain tag mixed into the ephemeral-layer salt.
const SALT_PREFIX: &[u8] = b"UnidentifiedDelivery";

/// Outcome of a successful decrypt: the recovered payload attributed to
/// the certified sender.
#[derive(Debug)]
pub struct DecryptResult {
    pub sender_recipient_id: String,
    pub sender_device_id: u32,
    pub payload: Vec<u8>,
    pub message_type: MessageType,
}

/// Orchestrates the two envelope layers around the external ratchet
/// cipher. Borrows its collaborators; owns no key material beyond one
/// call.
pub struct SealedSenderCipher<'a, C> {
    store: &'a mut dyn ProtocolStore<C>,
    ratchet: &'a mut dyn RatchetCipher<C>,
    reset: Option<&'a mut dyn ResetDelegate<C>>,
}

impl<'a, C> SealedSenderCipher<'a, C> {
    pub fn new(
        store: &'a mut dyn ProtocolStore<C>,
        ratchet: &'a mut dyn RatchetCipher<C>,
    ) -> Self {
        Self {
            store,
            ratchet,
            reset: None,
        }
    }

    pub fn with_reset_delegate(mut self, delegate: &'a mut dyn ResetDelegate<C>) -> Self {
        self.reset = Some(delegate);
        self
    }

    // ── Encrypt ──────────────────────────────────────────────────────────

    /// Seal `plaintext` for `recipient_id` / `device_id` into an envelope.
    ///
    /// `use_fallback` selects the sessionless path; otherwise the inner
    /// ciphertext comes from the ratchet cipher. No partial envelope is
    /// ever returned.
    pub fn encrypt(
        &mut self,
        recipient_id: &str,
        device_id: u32,
        plaintext: &[u8],
        sender_certificate: &SenderCertificate,
        use_fallback: bool,
        ctx: &mut C,
    ) -> Result<Vec<u8>, SessionError> {
        if recipient_id.is_empty() {
            return Err(SessionError::InvalidInput("empty recipient id".into()));
        }
        if device_id == 0 {
            return Err(SessionError::InvalidInput(
                "device id must be positive".into(),
            ));
        }
        let ours = self
            .store
            .identity_key_pair(ctx)
            .ok_or(SessionError::MissingIdentityKey)?;
        let their_identity = PublicKey::from_hex_id(recipient_id)?;

        let inner = if use_fallback {
            let cipher = FallbackCipher::new(ours.private(), &their_identity)?;
            CipherMessage::Fallback(cipher.encrypt(plaintext)?)
        } else {
            self.ratchet
                .encrypt(recipient_id, device_id, plaintext, ctx)?
        };

        // Ephemeral layer: fresh key pair, salt binds recipient and
        // ephemeral keys under the domain tag.
        let ephemeral = KeyPair::generate();
        let mut ephemeral_salt = Vec::new();
        ephemeral_salt.extend_from_slice(SALT_PREFIX);
        ephemeral_salt.extend_from_slice(&their_identity.serialize());
        ephemeral_salt.extend_from_slice(&ephemeral.public.serialize());

        let ephemeral_shared = agree(ephemeral.private(), &their_identity)?;
        let ephemeral_keys = EphemeralKeys::derive(&ephemeral_shared, &ephemeral_salt)?;

        let encrypted_static = sealed_box::seal(
            &ephemeral_keys.cipher_key,
            &ephemeral_keys.mac_key,
            &ours.public.serialize(),
        )?;

        // Static layer: both identity keys, salt chains from the
        // ephemeral layer.
        let mut static_salt = Vec::new();
        static_salt.extend_from_slice(&ephemeral_keys.chain_key);
        static_salt.extend_from_slice(&encrypted_static);

        let static_shared = agree(ours.private(), &their_identity)?;
        let static_keys = StaticKeys::derive(&static_shared, &static_salt)?;

        let content = UnidentifiedSenderMessageContent {
            message_type: inner.message_type(),
            sender_certificate: sender_certificate.clone(),
            content: inner.content().to_vec(),
        };
        let encrypted_message = sealed_box::seal(
            &static_keys.cipher_key,
            &static_keys.mac_key,
            &content.encode(),
        )?;

        let envelope = UnidentifiedSenderMessage {
            ephemeral_key: ephemeral.public.clone(),
            encrypted_static,
            encrypted_message,
        };
        Ok(envelope.encode())
    }

    // ── Decrypt ──────────────────────────────────────────────────────────

    /// Open an envelope, validate the embedded sender certificate at
    /// `validation_time`, and dispatch the inner ciphertext.
    pub fn decrypt(
        &mut self,
        validator: &dyn CertificateValidator,
        ciphertext: &[u8],
        validation_time: u64,
        local_recipient_id: &str,
        local_device_id: u32,
        ctx: &mut C,
    ) -> Result<DecryptResult, SessionError> {
        let ours = self
            .store
            .identity_key_pair(ctx)
            .ok_or(SessionError::MissingIdentityKey)?;

        let envelope = UnidentifiedSenderMessage::decode(ciphertext)?;

        let mut ephemeral_salt = Vec::new();
        ephemeral_salt.extend_from_slice(SALT_PREFIX);
        ephemeral_salt.extend_from_slice(&ours.public.serialize());
        ephemeral_salt.extend_from_slice(&envelope.ephemeral_key.serialize());

        let ephemeral_shared = agree(ours.private(), &envelope.ephemeral_key)?;
        let ephemeral_keys = EphemeralKeys::derive(&ephemeral_shared, &ephemeral_salt)?;

        let sender_identity_bytes = sealed_box::open(
            &ephemeral_keys.cipher_key,
            &ephemeral_keys.mac_key,
            &envelope.encrypted_static,
        )?;
        let sender_identity = PublicKey::deserialize(&sender_identity_bytes)?;

        let mut static_salt = Vec::new();
        static_salt.extend_from_slice(&ephemeral_keys.chain_key);
        static_salt.extend_from_slice(&envelope.encrypted_static);

        let static_shared = agree(ours.private(), &sender_identity)?;
        let static_keys = StaticKeys::derive(&static_shared, &static_salt)?;

        let content_bytes = sealed_box::open(
            &static_keys.cipher_key,
            &static_keys.mac_key,
            &envelope.encrypted_message,
        )?;
        let content = UnidentifiedSenderMessageContent::decode(&content_bytes)?;

        let sender_recipient_id = content
            .sender_certificate
            .sender_recipient_id()
            .to_string();
        let sender_device_id = content.sender_certificate.sender_device_id();

        if sender_recipient_id == local_recipient_id && sender_device_id == local_device_id {
            info!("discarding self-sent message");
            return Err(SessionError::SelfSentMessage);
        }

        // From here on the sender is known; attribute every failure.
        validator
            .validate_sender(&content.sender_certificate, validation_time)
            .map_err(|e| {
                SessionError::known_sender(&sender_recipient_id, sender_device_id, e.into())
            })?;

        if sender_device_id > i32::MAX as u32 {
            return Err(SessionError::known_sender(
                &sender_recipient_id,
                sender_device_id,
                SessionError::InvalidSenderDeviceId(sender_device_id),
            ));
        }

        debug!(
            sender = %sender_identity.fingerprint(),
            kind = ?content.message_type,
            "envelope opened"
        );

        let payload = self
            .decrypt_inner(&ours, &content, &sender_recipient_id, sender_device_id, ctx)
            .map_err(|e| {
                SessionError::known_sender(&sender_recipient_id, sender_device_id, e)
            })?;

        Ok(DecryptResult {
            sender_recipient_id,
            sender_device_id,
            payload,
            message_type: content.message_type,
        })
    }

    /// Dispatch the inner ciphertext to the ratchet or fallback cipher,
    /// reconciling session-reset state as a side effect.
    fn decrypt_inner(
        &mut self,
        ours: &KeyPair,
        content: &UnidentifiedSenderMessageContent,
        sender_id: &str,
        sender_device_id: u32,
        ctx: &mut C,
    ) -> Result<Vec<u8>, SessionError> {
        match content.message_type {
            MessageType::Fallback => {
                let sender_identity = PublicKey::from_hex_id(sender_id)?;
                let cipher = FallbackCipher::new(ours.private(), &sender_identity)?;
                cipher.decrypt(&content.content)
            }
            MessageType::Whisper | MessageType::PreKey => {
                // Session state before the ratchet runs, for reset
                // reconciliation afterwards.
                let previous = self
                    .store
                    .load_session(sender_id, sender_device_id, ctx)?
                    .and_then(|record| record.current_state().cloned());

                if content.message_type == MessageType::PreKey {
                    if let Some(delegate) = self.reset.as_ref() {
                        delegate.validate_prekey_message(sender_id, &content.content, ctx)?;
                    }
                }

                let message =
                    CipherMessage::from_parts(content.message_type, content.content.clone());
                let plaintext = self
                    .ratchet
                    .decrypt(sender_id, sender_device_id, &message, ctx)?;

                // The plaintext is already recovered; reconciliation
                // problems are logged, never raised.
                if let Some(delegate) = self.reset.as_mut() {
                    let mut coordinator =
                        SessionResetCoordinator::new(&mut *self.store, &mut **delegate);
                    if let Err(err) =
                        coordinator.reconcile(sender_id, sender_device_id, previous.as_ref(), ctx)
                    {
                        warn!(sender_id, error = %err, "session reset reconciliation failed");
                    }
                }

                Ok(plaintext)
            }
        }
    }
}
