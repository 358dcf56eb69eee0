//! Certificate chain types: trust root -> server -> sender.
//!
//! A `ServerCertificate` binds a server signing key to a key id and is
//! signed by the compiled-in trust root. A `SenderCertificate` binds a
//! sender (recipient id + device id, with an optional expiry) and is signed
//! by a server certificate's key.
//!
//! Signatures cover the deterministic wire encoding of the certified
//! fields only, never the signature fields themselves. Validation policy
//! (trust root, revocation, expiry ordering) lives with the consumer; these
//! types only carry and frame the data.

use shroud_crypto::keys::SERIALIZED_KEY_LEN;
use shroud_crypto::{KeyPair, PublicKey};

use crate::error::ProtoError;
use crate::wire::{Reader, Writer};

// ── Server certificate ───────────────────────────────────────────────────────

/// Issued by the trust root for one server signing key. Immutable once
/// parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCertificate {
    key_id: u32,
    key: PublicKey,
    signature: Vec<u8>,
}

impl ServerCertificate {
    /// Sign a server key with the trust root.
    pub fn issue(trust_root: &KeyPair, key_id: u32, key: PublicKey) -> Self {
        let signature = trust_root.sign(&Self::signed_bytes(key_id, &key));
        Self {
            key_id,
            key,
            signature,
        }
    }

    /// The byte representation the signature covers: `key_id || key`.
    pub fn signed_bytes(key_id: u32, key: &PublicKey) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_u32(key_id).put_raw(&key.serialize());
        w.finish()
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_u32(self.key_id)
            .put_raw(&self.key.serialize())
            .put_bytes(&self.signature);
        w.finish()
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtoError> {
        let mut r = Reader::new(data);
        let cert = Self::read(&mut r)?;
        if !r.is_empty() {
            return Err(ProtoError::MalformedCertificate(format!(
                "{} trailing bytes after server certificate",
                r.remaining()
            )));
        }
        Ok(cert)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, ProtoError> {
        let key_id = r.get_u32("server key id")?;
        let key = PublicKey::deserialize(r.get_raw(SERIALIZED_KEY_LEN, "server key")?)?;
        let signature = r.get_bytes("server signature")?.to_vec();
        if signature.is_empty() {
            return Err(ProtoError::MalformedCertificate(
                "empty server signature".into(),
            ));
        }
        Ok(Self {
            key_id,
            key,
            signature,
        })
    }
}

// ── Sender certificate ───────────────────────────────────────────────────────

/// Binds a sender's recipient id and device id, countersigned by a server
/// certificate. The sender signature is optional on the wire; issuers in
/// this crate always attach one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderCertificate {
    sender_recipient_id: String,
    sender_device_id: u32,
    expires_at: Option<u64>,
    signer: ServerCertificate,
    signature: Option<Vec<u8>>,
}

impl SenderCertificate {
    /// Sign sender attributes with a server key; `signer` must be the
    /// certificate of that same key.
    pub fn issue(
        server: &KeyPair,
        signer: ServerCertificate,
        sender_recipient_id: impl Into<String>,
        sender_device_id: u32,
        expires_at: Option<u64>,
    ) -> Self {
        let sender_recipient_id = sender_recipient_id.into();
        let signed = Self::signed_bytes_of(&sender_recipient_id, sender_device_id, expires_at);
        let signature = Some(server.sign(&signed));
        Self {
            sender_recipient_id,
            sender_device_id,
            expires_at,
            signer,
            signature,
        }
    }

    /// The byte representation the sender signature covers:
    /// `recipient_id || device_id || expiry`.
    pub fn signed_bytes(&self) -> Vec<u8> {
        Self::signed_bytes_of(
            &self.sender_recipient_id,
            self.sender_device_id,
            self.expires_at,
        )
    }

    fn signed_bytes_of(recipient_id: &str, device_id: u32, expires_at: Option<u64>) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_str(recipient_id)
            .put_u32(device_id)
            .put_opt_u64(expires_at);
        w.finish()
    }

    pub fn sender_recipient_id(&self) -> &str {
        &self.sender_recipient_id
    }

    pub fn sender_device_id(&self) -> u32 {
        self.sender_device_id
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    pub fn signer(&self) -> &ServerCertificate {
        &self.signer
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_str(&self.sender_recipient_id)
            .put_u32(self.sender_device_id)
            .put_opt_u64(self.expires_at)
            .put_bytes(&self.signer.encode())
            .put_opt_bytes(self.signature.as_deref());
        w.finish()
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtoError> {
        let mut r = Reader::new(data);
        let sender_recipient_id = r.get_str("sender recipient id")?.to_string();
        if sender_recipient_id.is_empty() {
            return Err(ProtoError::MalformedCertificate(
                "empty sender recipient id".into(),
            ));
        }
        let sender_device_id = r.get_u32("sender device id")?;
        let expires_at = r.get_opt_u64("expiry")?;
        let signer = ServerCertificate::decode(r.get_bytes("server certificate")?)?;
        let signature = r.get_opt_bytes("sender signature")?.map(<[u8]>::to_vec);
        if !r.is_empty() {
            return Err(ProtoError::MalformedCertificate(format!(
                "{} trailing bytes after sender certificate",
                r.remaining()
            )));
        }
        Ok(Self {
            sender_recipient_id,
            sender_device_id,
            expires_at,
            signer,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (KeyPair, KeyPair, ServerCertificate) {
        let trust_root = KeyPair::generate();
        let server = KeyPair::generate();
        let server_cert = ServerCertificate::issue(&trust_root, 7, server.public.clone());
        (trust_root, server, server_cert)
    }

    #[test]
    fn server_certificate_roundtrip() {
        let (trust_root, _server, cert) = chain();
        let decoded = ServerCertificate::decode(&cert.encode()).unwrap();
        assert_eq!(decoded, cert);
        trust_root
            .public
            .verify(
                &ServerCertificate::signed_bytes(decoded.key_id(), decoded.key()),
                decoded.signature(),
            )
            .unwrap();
    }

    #[test]
    fn sender_certificate_roundtrip() {
        let (_trust_root, server, server_cert) = chain();
        let sender = KeyPair::generate();
        let cert = SenderCertificate::issue(
            &server,
            server_cert,
            sender.public.to_hex_id(),
            1,
            Some(31_337),
        );
        let decoded = SenderCertificate::decode(&cert.encode()).unwrap();
        assert_eq!(decoded, cert);
        server
            .public
            .verify(&decoded.signed_bytes(), decoded.signature().unwrap())
            .unwrap();
    }

    #[test]
    fn sender_certificate_without_expiry_or_signature() {
        let (_trust_root, _server, server_cert) = chain();
        // Hand-build the optional-free wire form.
        let mut w = Writer::new();
        w.put_str("05aa")
            .put_u32(2)
            .put_opt_u64(None)
            .put_bytes(&server_cert.encode())
            .put_opt_bytes(None);
        let decoded = SenderCertificate::decode(&w.finish()).unwrap();
        assert_eq!(decoded.expires_at(), None);
        assert!(decoded.signature().is_none());
    }

    #[test]
    fn rejects_truncated_and_trailing_bytes() {
        let (_trust_root, server, server_cert) = chain();
        let cert = SenderCertificate::issue(&server, server_cert, "05ab", 1, None);
        let encoded = cert.encode();
        for cut in [1, encoded.len() / 2, encoded.len() - 1] {
            assert!(SenderCertificate::decode(&encoded[..cut]).is_err());
        }
        let mut padded = encoded.clone();
        padded.push(0);
        assert!(SenderCertificate::decode(&padded).is_err());
    }

    #[test]
    fn rejects_empty_recipient_id() {
        let (_trust_root, _server, server_cert) = chain();
        let mut w = Writer::new();
        w.put_str("")
            .put_u32(1)
            .put_opt_u64(None)
            .put_bytes(&server_cert.encode())
            .put_opt_bytes(None);
        assert!(SenderCertificate::decode(&w.finish()).is_err());
    }
}
