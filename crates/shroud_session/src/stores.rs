//! Interfaces to the external session and identity stores, and the narrow
//! view of their records this crate needs.
//!
//! Stores are injected as trait objects; there are no ambient singletons.
//! Every method threads an opaque caller context `C` (the store's
//! transaction handle) so one decrypt's load / decrypt / compare / mutate
//! sequence stays atomic with respect to other calls for the same
//! recipient and device.

use serde::{Deserialize, Serialize};
use shroud_crypto::{KeyPair, PublicKey};
use shroud_proto::CipherMessage;

use crate::error::SessionError;

// ── Session records ──────────────────────────────────────────────────────────

/// One ratchet session as this crate sees it: the session-identifying base
/// key plus bookkeeping. The ratchet's own chain state is opaque to us and
/// stays inside the external cipher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Identifies the session; compared to detect a peer re-keying.
    pub base_key: PublicKey,
    /// Epoch milliseconds at establishment.
    pub created_at: u64,
}

/// All sessions with one (recipient, device): the first state is current,
/// the rest are archived in most-recently-used order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    states: Vec<SessionState>,
}

impl SessionRecord {
    pub fn new(current: SessionState) -> Self {
        Self {
            states: vec![current],
        }
    }

    pub fn current_state(&self) -> Option<&SessionState> {
        self.states.first()
    }

    pub fn archived_states(&self) -> &[SessionState] {
        self.states.get(1..).unwrap_or(&[])
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Install a new current state, archiving the old one.
    pub fn promote(&mut self, state: SessionState) {
        self.states.insert(0, state);
    }

    /// Put `previous` back on top, dropping any other copy of it. The
    /// displaced current state stays archived.
    pub fn restore(&mut self, previous: SessionState) {
        self.states.retain(|s| s.base_key != previous.base_key);
        self.states.insert(0, previous);
    }

    /// Delete every state except the current one.
    pub fn retain_current(&mut self) {
        self.states.truncate(1);
    }
}

// ── Store traits ─────────────────────────────────────────────────────────────

/// Capability set required from the external protocol store.
pub trait ProtocolStore<C> {
    fn load_session(
        &self,
        recipient_id: &str,
        device_id: u32,
        ctx: &mut C,
    ) -> Result<Option<SessionRecord>, SessionError>;

    fn store_session(
        &mut self,
        recipient_id: &str,
        device_id: u32,
        record: SessionRecord,
        ctx: &mut C,
    ) -> Result<(), SessionError>;

    fn identity_key_pair(&self, ctx: &mut C) -> Option<KeyPair>;
}

/// The external pairwise ratchet cipher. Produces and consumes the inner
/// ciphertext; this crate never looks inside it.
pub trait RatchetCipher<C> {
    fn encrypt(
        &mut self,
        recipient_id: &str,
        device_id: u32,
        plaintext: &[u8],
        ctx: &mut C,
    ) -> Result<CipherMessage, SessionError>;

    fn decrypt(
        &mut self,
        sender_id: &str,
        device_id: u32,
        message: &CipherMessage,
        ctx: &mut C,
    ) -> Result<Vec<u8>, SessionError>;
}

// ── Session-restoration delegate ─────────────────────────────────────────────

/// Where a pairwise reset handshake stands for one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStatus {
    /// Nothing pending.
    None,
    /// We initiated a reset and are waiting for the peer to adopt it.
    RequestSent,
    /// The peer's reset request has been observed locally.
    RequestReceived,
}

/// Callbacks the embedding application supplies for session restoration.
pub trait ResetDelegate<C> {
    /// Called before a session-establishing message is handed to the
    /// ratchet cipher.
    fn validate_prekey_message(
        &self,
        sender_id: &str,
        content: &[u8],
        ctx: &mut C,
    ) -> Result<(), SessionError>;

    fn reset_status(&self, recipient_id: &str) -> ResetStatus;

    /// Exactly one call per successful reset adoption.
    fn on_new_session_adopted(&mut self, recipient_id: &str, ctx: &mut C);
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_crypto::KeyPair;

    fn state(created_at: u64) -> SessionState {
        SessionState {
            base_key: KeyPair::generate().public,
            created_at,
        }
    }

    #[test]
    fn promote_archives_the_old_current() {
        let first = state(1);
        let second = state(2);
        let mut record = SessionRecord::new(first.clone());
        record.promote(second.clone());
        assert_eq!(record.current_state(), Some(&second));
        assert_eq!(record.archived_states(), &[first]);
    }

    #[test]
    fn restore_moves_previous_back_on_top_without_duplicating() {
        let old = state(1);
        let new = state(2);
        let mut record = SessionRecord::new(old.clone());
        record.promote(new.clone());
        record.restore(old.clone());
        assert_eq!(record.current_state(), Some(&old));
        assert_eq!(record.archived_states(), &[new]);
        assert_eq!(record.state_count(), 2);
    }

    #[test]
    fn retain_current_drops_all_archives() {
        let mut record = SessionRecord::new(state(1));
        record.promote(state(2));
        record.promote(state(3));
        record.retain_current();
        assert_eq!(record.state_count(), 1);
        assert!(record.archived_states().is_empty());
    }
}
