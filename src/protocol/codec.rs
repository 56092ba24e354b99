//! Primitive encoders and decoders for the searchd API payload.
//!
//! Every value on the outer protocol is fixed-width and big-endian. Strings and
//! byte blobs carry a 32-bit length prefix and no terminator. Booleans are
//! written either as a full 32-bit word or as a single byte; which one is used
//! is decided by each field of each command, not by the codec.
//!
//! [`ApiWriter`] appends to a byte vector (normally the connection's
//! [`Buffer`](super::Buffer)), and [`ApiReader`] walks a borrowed slice with a
//! cursor. Reading past the end of the slice is reported as a
//! [`DecodeError`], since the bytes being read come straight off the network.
use std::{string::FromUtf8Error, time::Duration};

use thiserror::Error;

use crate::value::{BsonField, BsonType, DocId};

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("unexpected end of payload: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("payload string is not valid utf-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("invalid length-encoded integer prefix 0x{0:02x}")]
    InvalidLenenc(u8),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Append-only writer over a byte vector.
pub struct ApiWriter<'a> {
    pub(crate) buf: &'a mut Vec<u8>,
}

impl<'a> ApiWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    pub fn put_u16(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    pub fn put_u32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    pub fn put_i32(&mut self, val: i32) {
        self.put_u32(val as u32);
    }

    pub fn put_u64(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    pub fn put_i64(&mut self, val: i64) {
        self.put_u64(val as u64);
    }

    pub fn put_docid(&mut self, val: DocId) {
        self.put_u64(val.0);
    }

    /// Writes a collection length. Lengths beyond `u32::MAX` do not fit the
    /// wire format and are truncated.
    pub fn put_len(&mut self, len: usize) {
        self.put_u32(len as u32);
    }

    pub fn put_f32(&mut self, val: f32) {
        self.put_u32(val.to_bits());
    }

    /// Milliseconds, truncated into a 32-bit word.
    pub fn put_duration(&mut self, val: Duration) {
        self.put_u32(val.as_millis() as u32);
    }

    pub fn put_bool_byte(&mut self, val: bool) {
        self.put_u8(u8::from(val));
    }

    pub fn put_bool_dword(&mut self, val: bool) {
        self.put_u32(u32::from(val));
    }

    /// Raw bytes, without a length prefix.
    pub fn put_bytes(&mut self, val: &[u8]) {
        self.buf.extend_from_slice(val);
    }

    pub fn put_string(&mut self, val: &str) {
        self.put_len(val.len());
        self.put_bytes(val.as_bytes());
    }
}

/// Cursor over a borrowed payload.
///
/// Slices returned by [`ApiReader::get_ref_bytes`] borrow the payload and so
/// cannot outlive the buffer they were read from; use
/// [`ApiReader::get_bytes`] for an owned copy.
#[derive(Debug, Clone)]
pub struct ApiReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ApiReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Takes exactly `len` raw bytes.
    pub fn get_raw(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Takes everything left in the payload.
    pub fn get_rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn get_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0; N];
        out.copy_from_slice(self.get_raw(N)?);
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.get_array::<1>()?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.get_array()?))
    }

    pub fn get_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.get_array()?))
    }

    pub fn get_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.get_u32()? as i32)
    }

    pub fn get_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.get_array()?))
    }

    pub fn get_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.get_u64()? as i64)
    }

    pub fn get_docid(&mut self) -> Result<DocId, DecodeError> {
        Ok(DocId(self.get_u64()?))
    }

    pub fn get_len(&mut self) -> Result<usize, DecodeError> {
        Ok(self.get_u32()? as usize)
    }

    pub fn get_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    pub fn get_duration(&mut self) -> Result<Duration, DecodeError> {
        Ok(Duration::from_millis(u64::from(self.get_u32()?)))
    }

    pub fn get_bool_byte(&mut self) -> Result<bool, DecodeError> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_bool_dword(&mut self) -> Result<bool, DecodeError> {
        Ok(self.get_u32()? != 0)
    }

    /// Length-prefixed blob as a view into the payload.
    pub fn get_ref_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.get_len()?;
        self.get_raw(len)
    }

    /// Length-prefixed blob as an owned copy.
    pub fn get_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.get_ref_bytes()?.to_vec())
    }

    pub fn get_string(&mut self) -> Result<String, DecodeError> {
        Ok(String::from_utf8(self.get_bytes()?)?)
    }

    /// A typed JSON field: one tag byte, then a blob unless the tag is `Eof`.
    pub fn get_bson_field(&mut self) -> Result<BsonField, DecodeError> {
        let tag = self.get_u8()?;
        let kind = BsonType::try_from(tag)
            .map_err(|_| DecodeError::Malformed(format!("unknown bson type {tag}")))?;
        let blob = match kind {
            BsonType::Eof => Vec::new(),
            _ => self.get_bytes()?,
        };
        Ok(BsonField { kind, blob })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_big_endian() {
        let mut buf = Vec::new();
        let mut writer = ApiWriter::new(&mut buf);
        writer.put_u16(0x0102);
        writer.put_u32(0x0304_0506);
        writer.put_u64(0x0708_090a_0b0c_0d0e);

        assert_eq!(
            buf,
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]
        );
    }

    #[test]
    fn scalars_survive_the_codec() {
        let mut buf = Vec::new();
        let mut writer = ApiWriter::new(&mut buf);
        writer.put_i32(-5);
        writer.put_i64(i64::MIN);
        writer.put_docid(DocId::MAX);
        writer.put_f32(-1.25);
        writer.put_bool_dword(true);
        writer.put_bool_byte(false);
        writer.put_duration(Duration::from_millis(1500));
        writer.put_string("");
        writer.put_string("héllo");

        let mut reader = ApiReader::new(&buf);
        assert_eq!(reader.get_i32().unwrap(), -5);
        assert_eq!(reader.get_i64().unwrap(), i64::MIN);
        assert_eq!(reader.get_docid().unwrap(), DocId::MAX);
        assert_eq!(reader.get_f32().unwrap(), -1.25);
        assert!(reader.get_bool_dword().unwrap());
        assert!(!reader.get_bool_byte().unwrap());
        assert_eq!(reader.get_duration().unwrap(), Duration::from_millis(1500));
        assert_eq!(reader.get_string().unwrap(), "");
        assert_eq!(reader.get_string().unwrap(), "héllo");
        assert!(reader.is_empty());
    }

    #[test]
    fn boolean_widths_differ_per_field() {
        let mut buf = Vec::new();
        let mut writer = ApiWriter::new(&mut buf);
        writer.put_bool_dword(true);
        writer.put_bool_byte(true);

        assert_eq!(buf, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn duration_truncates_to_milliseconds() {
        let mut buf = Vec::new();
        ApiWriter::new(&mut buf).put_duration(Duration::from_micros(2999));

        assert_eq!(ApiReader::new(&buf).get_u32().unwrap(), 2);
    }

    #[test]
    fn reading_past_the_end_is_an_error() {
        let mut reader = ApiReader::new(&[0, 0, 1]);

        assert_eq!(
            reader.get_u32(),
            Err(DecodeError::UnexpectedEof {
                needed: 4,
                remaining: 3
            })
        );
    }

    #[test]
    fn string_length_past_the_end_is_an_error() {
        let mut reader = ApiReader::new(&[0, 0, 0, 9, b'a', b'b']);

        assert!(matches!(
            reader.get_string(),
            Err(DecodeError::UnexpectedEof { needed: 9, .. })
        ));
    }

    #[test]
    fn ref_bytes_borrow_while_bytes_copy() {
        let payload = [0, 0, 0, 2, 7, 8, 0, 0, 0, 1, 9];
        let mut reader = ApiReader::new(&payload);

        let view = reader.get_ref_bytes().unwrap();
        assert_eq!(view.as_ptr(), payload[4..].as_ptr());

        let copy = reader.get_bytes().unwrap();
        assert_eq!(copy, vec![9]);
    }

    #[test]
    fn bson_field_with_and_without_blob() {
        let payload = [0, 1, 0, 0, 0, 4, 42, 0, 0, 0];
        let mut reader = ApiReader::new(&payload);

        assert_eq!(
            reader.get_bson_field().unwrap(),
            BsonField {
                kind: BsonType::Eof,
                blob: vec![]
            }
        );
        assert_eq!(
            reader.get_bson_field().unwrap(),
            BsonField {
                kind: BsonType::Int32,
                blob: vec![42, 0, 0, 0]
            }
        );
    }
}
