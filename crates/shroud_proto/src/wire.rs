//! Compact binary field framing.
//!
//! Non-self-describing: field order and widths are fixed by the caller on
//! both sides. Integers are little-endian; variable-length fields carry a
//! u32 length prefix; optional fields carry a one-byte presence flag.

use crate::error::ProtoError;

// ── Writer ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Fixed-width field: raw bytes, no length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Variable-length field: u32 LE length, then the bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn put_str(&mut self, s: &str) -> &mut Self {
        self.put_bytes(s.as_bytes())
    }

    /// Optional fixed-width u64: presence flag, then the value.
    pub fn put_opt_u64(&mut self, v: Option<u64>) -> &mut Self {
        match v {
            Some(v) => self.put_u8(1).put_u64(v),
            None => self.put_u8(0),
        }
    }

    /// Optional variable-length field: presence flag, then the framed bytes.
    pub fn put_opt_bytes(&mut self, bytes: Option<&[u8]>) -> &mut Self {
        match bytes {
            Some(b) => self.put_u8(1).put_bytes(b),
            None => self.put_u8(0),
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// Sequential field reader. Every accessor names the field it expects so
/// truncation errors point at the offending field.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize, name: &'static str) -> Result<&'a [u8], ProtoError> {
        if self.remaining() < n {
            return Err(ProtoError::Truncated(name));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn get_u8(&mut self, name: &'static str) -> Result<u8, ProtoError> {
        Ok(self.take(1, name)?[0])
    }

    pub fn get_u32(&mut self, name: &'static str) -> Result<u32, ProtoError> {
        let b = self.take(4, name)?;
        Ok(u32::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn get_u64(&mut self, name: &'static str) -> Result<u64, ProtoError> {
        let b = self.take(8, name)?;
        Ok(u64::from_le_bytes(b.try_into().unwrap()))
    }

    /// Fixed-width field.
    pub fn get_raw(&mut self, n: usize, name: &'static str) -> Result<&'a [u8], ProtoError> {
        self.take(n, name)
    }

    /// Variable-length field: u32 LE length, then the bytes.
    pub fn get_bytes(&mut self, name: &'static str) -> Result<&'a [u8], ProtoError> {
        let len = self.get_u32(name)? as usize;
        self.take(len, name)
    }

    pub fn get_str(&mut self, name: &'static str) -> Result<&'a str, ProtoError> {
        let bytes = self.get_bytes(name)?;
        std::str::from_utf8(bytes)
            .map_err(|_| ProtoError::MalformedCertificate(format!("{name} is not UTF-8")))
    }

    pub fn get_opt_u64(&mut self, name: &'static str) -> Result<Option<u64>, ProtoError> {
        match self.get_u8(name)? {
            0 => Ok(None),
            _ => Ok(Some(self.get_u64(name)?)),
        }
    }

    pub fn get_opt_bytes(&mut self, name: &'static str) -> Result<Option<&'a [u8]>, ProtoError> {
        match self.get_u8(name)? {
            0 => Ok(None),
            _ => Ok(Some(self.get_bytes(name)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_field_kinds() {
        let mut w = Writer::new();
        w.put_u8(0x42)
            .put_u32(0xDEAD_BEEF)
            .put_bytes(b"var")
            .put_raw(b"fix")
            .put_str("id")
            .put_opt_u64(Some(7))
            .put_opt_u64(None)
            .put_opt_bytes(Some(b"sig"))
            .put_opt_bytes(None);
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        assert_eq!(r.get_u8("a").unwrap(), 0x42);
        assert_eq!(r.get_u32("b").unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.get_bytes("c").unwrap(), b"var");
        assert_eq!(r.get_raw(3, "d").unwrap(), b"fix");
        assert_eq!(r.get_str("e").unwrap(), "id");
        assert_eq!(r.get_opt_u64("f").unwrap(), Some(7));
        assert_eq!(r.get_opt_u64("g").unwrap(), None);
        assert_eq!(r.get_opt_bytes("h").unwrap(), Some(&b"sig"[..]));
        assert_eq!(r.get_opt_bytes("i").unwrap(), None);
        assert!(r.is_empty());
    }

    #[test]
    fn truncation_names_the_field() {
        let mut w = Writer::new();
        w.put_u32(10).put_raw(b"short");
        let buf = w.finish();
        let mut r = Reader::new(&buf);
        let err = r.get_bytes("payload").unwrap_err();
        assert!(matches!(err, ProtoError::Truncated("payload")));
    }

    #[test]
    fn length_prefix_larger_than_input_is_truncation() {
        let mut r = Reader::new(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(r.get_bytes("huge").is_err());
    }
}
