//! shroud_proto - wire types and serialisation for the sealed-sender protocol
//!
//! All on-wire objects use a compact non-self-describing binary framing;
//! both peers must agree on field order and widths, which is what these
//! types pin down.
//!
//! # Modules
//! - `envelope`    - outer envelope + inner message content
//! - `certificate` - server and sender certificates
//! - `wire`        - field reader/writer primitives
//! - `error`       - unified error type

pub mod certificate;
pub mod envelope;
pub mod error;
pub mod wire;

pub use certificate::{SenderCertificate, ServerCertificate};
pub use envelope::{
    CipherMessage, MessageType, UnidentifiedSenderMessage, UnidentifiedSenderMessageContent,
    CURRENT_VERSION,
};
pub use error::ProtoError;
