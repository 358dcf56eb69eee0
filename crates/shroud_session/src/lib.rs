//! shroud_session - sealed-sender envelope cipher and session reconciliation
//!
//! Wraps the external pairwise ratchet cipher in the two-layer sealed
//! envelope, validates the certificate chain on receive, and reconciles
//! divergent ratchet sessions after a reset handshake.
//!
//! # Module layout
//! - `cipher`   - the sealed-sender envelope cipher (encrypt / decrypt)
//! - `fallback` - sessionless single-shot cipher for pre-session peers
//! - `trust`    - certificate chain validation against the trust root
//! - `reset`    - session-reset reconciliation state machine
//! - `stores`   - traits for the external stores, ratchet, and delegate
//! - `error`    - unified error type

pub mod cipher;
pub mod error;
pub mod fallback;
pub mod reset;
pub mod stores;
pub mod trust;

pub use cipher::{DecryptResult, SealedSenderCipher};
pub use error::SessionError;
pub use fallback::FallbackCipher;
pub use reset::SessionResetCoordinator;
pub use stores::{
    ProtocolStore, RatchetCipher, ResetDelegate, ResetStatus, SessionRecord, SessionState,
};
pub use trust::{CertificateError, CertificateValidator, TrustRootValidator};

// ── Test doubles ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testutil {
    //! In-memory stand-ins for the external collaborators.

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use shroud_crypto::{sealed_box, KeyPair};
    use shroud_proto::{CipherMessage, MessageType};

    use crate::error::SessionError;
    use crate::stores::{
        ProtocolStore, RatchetCipher, ResetDelegate, ResetStatus, SessionRecord, SessionState,
    };

    pub(crate) type SessionMap = Rc<RefCell<HashMap<(String, u32), SessionRecord>>>;

    // ── Store ────────────────────────────────────────────────────────────

    pub(crate) struct InMemoryStore {
        identity: Option<KeyPair>,
        sessions: SessionMap,
    }

    impl InMemoryStore {
        pub fn new(identity: KeyPair) -> Self {
            Self {
                identity: Some(identity),
                sessions: Rc::new(RefCell::new(HashMap::new())),
            }
        }

        pub fn without_identity() -> Self {
            Self {
                identity: None,
                sessions: Rc::new(RefCell::new(HashMap::new())),
            }
        }

        /// Shared handle to the session map, for test doubles that mutate
        /// sessions behind the store's back (as a real ratchet would).
        pub fn sessions(&self) -> SessionMap {
            Rc::clone(&self.sessions)
        }

        pub fn insert_session(&mut self, recipient_id: &str, device_id: u32, record: SessionRecord) {
            self.sessions
                .borrow_mut()
                .insert((recipient_id.to_string(), device_id), record);
        }

        pub fn session(&self, recipient_id: &str, device_id: u32) -> Option<SessionRecord> {
            self.sessions
                .borrow()
                .get(&(recipient_id.to_string(), device_id))
                .cloned()
        }
    }

    impl ProtocolStore<()> for InMemoryStore {
        fn load_session(
            &self,
            recipient_id: &str,
            device_id: u32,
            _ctx: &mut (),
        ) -> Result<Option<SessionRecord>, SessionError> {
            Ok(self.session(recipient_id, device_id))
        }

        fn store_session(
            &mut self,
            recipient_id: &str,
            device_id: u32,
            record: SessionRecord,
            _ctx: &mut (),
        ) -> Result<(), SessionError> {
            self.insert_session(recipient_id, device_id, record);
            Ok(())
        }

        fn identity_key_pair(&self, _ctx: &mut ()) -> Option<KeyPair> {
            self.identity.clone()
        }
    }

    // ── Ratchet ──────────────────────────────────────────────────────────

    /// Deterministic ratchet stand-in: both parties share one symmetric
    /// key. Optionally installs a new session state after a successful
    /// decrypt, the way a real ratchet re-keys.
    pub(crate) struct SharedKeyRatchet {
        key: [u8; 32],
        mode: MessageType,
        rekey: Option<(SessionMap, SessionState)>,
    }

    impl SharedKeyRatchet {
        pub fn new(key: [u8; 32], mode: MessageType) -> Self {
            Self {
                key,
                mode,
                rekey: None,
            }
        }

        pub fn with_rekey(mut self, sessions: SessionMap, state: SessionState) -> Self {
            self.rekey = Some((sessions, state));
            self
        }
    }

    impl RatchetCipher<()> for SharedKeyRatchet {
        fn encrypt(
            &mut self,
            _recipient_id: &str,
            _device_id: u32,
            plaintext: &[u8],
            _ctx: &mut (),
        ) -> Result<CipherMessage, SessionError> {
            let sealed = sealed_box::seal(&self.key, &self.key, plaintext)?;
            Ok(CipherMessage::from_parts(self.mode, sealed))
        }

        fn decrypt(
            &mut self,
            sender_id: &str,
            device_id: u32,
            message: &CipherMessage,
            _ctx: &mut (),
        ) -> Result<Vec<u8>, SessionError> {
            let plaintext = sealed_box::open(&self.key, &self.key, message.content())?;
            if let Some((sessions, state)) = &self.rekey {
                let mut sessions = sessions.borrow_mut();
                let record = sessions
                    .entry((sender_id.to_string(), device_id))
                    .or_default();
                record.promote(state.clone());
            }
            Ok(plaintext)
        }
    }

    // ── Delegate ─────────────────────────────────────────────────────────

    pub(crate) struct RecordingDelegate {
        pub status: ResetStatus,
        pub adopted: Vec<String>,
        pub prekey_checks: RefCell<Vec<String>>,
        pub fail_prekey: bool,
    }

    impl RecordingDelegate {
        pub fn new(status: ResetStatus) -> Self {
            Self {
                status,
                adopted: Vec::new(),
                prekey_checks: RefCell::new(Vec::new()),
                fail_prekey: false,
            }
        }
    }

    impl ResetDelegate<()> for RecordingDelegate {
        fn validate_prekey_message(
            &self,
            sender_id: &str,
            _content: &[u8],
            _ctx: &mut (),
        ) -> Result<(), SessionError> {
            self.prekey_checks.borrow_mut().push(sender_id.to_string());
            if self.fail_prekey {
                return Err(SessionError::InvalidInput(
                    "prekey message rejected".into(),
                ));
            }
            Ok(())
        }

        fn reset_status(&self, _recipient_id: &str) -> ResetStatus {
            self.status
        }

        fn on_new_session_adopted(&mut self, recipient_id: &str, _ctx: &mut ()) {
            self.adopted.push(recipient_id.to_string());
        }
    }
}
