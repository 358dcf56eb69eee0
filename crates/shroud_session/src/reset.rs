//! Session-reset reconciliation.
//!
//! After the ratchet cipher decrypts a message, the session on disk may no
//! longer be the one it was loaded as: the peer can have silently re-keyed.
//! This coordinator compares the state recorded before decryption with the
//! state after and settles any pending reset handshake.
//!
//! Decision table over (reset status, base-key equality):
//!
//!   status           | base key changed          | base key unchanged
//!   -----------------+---------------------------+--------------------
//!   None             | nothing pending, no-op    | no-op
//!   RequestReceived  | peer answered our request | peer kept the session
//!                    | from an OLD session:      | we already had: reset
//!                    | restore previous, wait    | done, keep only it,
//!                    |                           | notify
//!   RequestSent      | peer adopted our reset:   | no-op
//!   (or initiator)   | keep only the new         |
//!                    | session, notify           |
//!
//! A first-ever message (no previous state) needs no bookkeeping. Getting
//! a branch wrong either loses session state or never converges, so the
//! table is reproduced exactly.

use tracing::debug;

use crate::error::SessionError;
use crate::stores::{ProtocolStore, ResetDelegate, ResetStatus, SessionState};

pub struct SessionResetCoordinator<'a, C> {
    store: &'a mut dyn ProtocolStore<C>,
    delegate: &'a mut dyn ResetDelegate<C>,
}

impl<'a, C> SessionResetCoordinator<'a, C> {
    pub fn new(
        store: &'a mut dyn ProtocolStore<C>,
        delegate: &'a mut dyn ResetDelegate<C>,
    ) -> Self {
        Self { store, delegate }
    }

    /// Reconcile the stored session for `recipient_id` against the state
    /// recorded before the ratchet cipher ran. Must be called inside the
    /// same store transaction as the decrypt itself.
    pub fn reconcile(
        &mut self,
        recipient_id: &str,
        device_id: u32,
        previous: Option<&SessionState>,
        ctx: &mut C,
    ) -> Result<(), SessionError> {
        let Some(previous) = previous else {
            // First message on this session; nothing to reconcile.
            return Ok(());
        };

        let status = self.delegate.reset_status(recipient_id);
        if status == ResetStatus::None {
            return Ok(());
        }

        let mut record = self
            .store
            .load_session(recipient_id, device_id, ctx)?
            .ok_or_else(|| {
                SessionError::SessionState(format!(
                    "no session record for {recipient_id} after decrypt"
                ))
            })?;
        let current = record
            .current_state()
            .ok_or_else(|| {
                SessionError::SessionState(format!(
                    "empty session record for {recipient_id} after decrypt"
                ))
            })?
            .clone();

        if current.base_key != previous.base_key {
            if status == ResetStatus::RequestReceived {
                // The peer used an old session to answer our reset request.
                // Put the pre-decrypt session back and keep waiting.
                debug!(recipient_id, "reset pending: restoring previous session state");
                record.restore(previous.clone());
                self.store
                    .store_session(recipient_id, device_id, record, ctx)?;
            } else {
                // We initiated and the peer moved to the new session.
                debug!(recipient_id, "reset succeeded: adopting new session");
                record.retain_current();
                self.store
                    .store_session(recipient_id, device_id, record, ctx)?;
                self.delegate.on_new_session_adopted(recipient_id, ctx);
            }
        } else if status == ResetStatus::RequestReceived {
            // The peer replied on the same session we already had; that
            // settles the reset too.
            debug!(recipient_id, "reset settled on the existing session");
            record.retain_current();
            self.store
                .store_session(recipient_id, device_id, record, ctx)?;
            self.delegate.on_new_session_adopted(recipient_id, ctx);
        }
        Ok(())
    }
}
