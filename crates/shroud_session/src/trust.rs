//! Certificate chain validation against the compiled-in trust root.
//!
//! Check order is load-bearing: signatures are verified before expiry and
//! revocation, so a certificate whose signature does not even verify is
//! indistinguishable from any other forgery. An attacker must not learn
//! whether a forged certificate's key id happens to be revoked or its
//! expiry stale.

use std::collections::HashSet;

use shroud_crypto::PublicKey;
use shroud_proto::{SenderCertificate, ServerCertificate};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertificateError {
    #[error("Certificate signature failed")]
    SignatureFailed,

    #[error("Certificate key id {0} is revoked")]
    Revoked(u32),

    #[error("Certificate expired at {expires_at} (validated at {validation_time})")]
    Expired { expires_at: u64, validation_time: u64 },
}

/// Validation policy seam; production code uses [`TrustRootValidator`].
pub trait CertificateValidator {
    fn validate_server(&self, cert: &ServerCertificate) -> Result<(), CertificateError>;

    fn validate_sender(
        &self,
        cert: &SenderCertificate,
        validation_time: u64,
    ) -> Result<(), CertificateError>;
}

/// Validates the chain trust-root -> server -> sender, with a revocation
/// set keyed by server key id.
pub struct TrustRootValidator {
    trust_root: PublicKey,
    revoked: HashSet<u32>,
}

impl TrustRootValidator {
    pub fn new(trust_root: PublicKey) -> Self {
        Self {
            trust_root,
            revoked: HashSet::new(),
        }
    }

    pub fn with_revoked(trust_root: PublicKey, revoked: impl IntoIterator<Item = u32>) -> Self {
        Self {
            trust_root,
            revoked: revoked.into_iter().collect(),
        }
    }

    pub fn revoke(&mut self, key_id: u32) {
        self.revoked.insert(key_id);
    }
}

impl CertificateValidator for TrustRootValidator {
    fn validate_server(&self, cert: &ServerCertificate) -> Result<(), CertificateError> {
        let signed = ServerCertificate::signed_bytes(cert.key_id(), cert.key());
        self.trust_root
            .verify(&signed, cert.signature())
            .map_err(|_| CertificateError::SignatureFailed)?;

        if self.revoked.contains(&cert.key_id()) {
            return Err(CertificateError::Revoked(cert.key_id()));
        }
        Ok(())
    }

    fn validate_sender(
        &self,
        cert: &SenderCertificate,
        validation_time: u64,
    ) -> Result<(), CertificateError> {
        self.validate_server(cert.signer())?;

        if let Some(signature) = cert.signature() {
            cert.signer()
                .key()
                .verify(&cert.signed_bytes(), signature)
                .map_err(|_| CertificateError::SignatureFailed)?;
        }

        if let Some(expires_at) = cert.expires_at() {
            if validation_time > expires_at {
                return Err(CertificateError::Expired {
                    expires_at,
                    validation_time,
                });
            }
        }
        Ok(())
    }
}
