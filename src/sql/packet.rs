//! MySQL-style packet framing and scalar encodings.
//!
//! ```text
//! | length u24 LE | sequence u8 | payload (length bytes) |
//! ```
//!
//! Unlike the outer protocol, integers here are little-endian, and variable
//! sized values use the length-encoded integer format:
//!
//! | first byte | value                               |
//! |------------|-------------------------------------|
//! | `< 0xfb`   | the byte itself                     |
//! | `0xfc`     | next 2 bytes, little-endian         |
//! | `0xfd`     | next 3 bytes, little-endian         |
//! | `0xfe`     | next 8 bytes, little-endian         |
//!
//! `0xfb` is the NULL marker inside rows and is never a valid integer prefix.
use crate::protocol::{ApiReader, DecodeError};

pub(crate) const NULL_MARKER: u8 = 0xfb;
pub(crate) const OK_HEADER: u8 = 0x00;
pub(crate) const EOF_HEADER: u8 = 0xfe;
pub(crate) const ERR_HEADER: u8 = 0xff;

const PACKET_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Packet<'a> {
    pub sequence: u8,
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    pub fn first(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// EOF packets are short; a longer packet starting with `0xfe` is a row
    /// whose first cell has an 8-byte length prefix.
    pub fn is_eof(&self) -> bool {
        self.first() == Some(EOF_HEADER) && (5..9).contains(&self.payload.len())
    }

    pub fn is_err(&self) -> bool {
        self.first() == Some(ERR_HEADER)
    }

    pub fn reader(&self) -> PacketReader<'a> {
        PacketReader::new(self.payload)
    }
}

/// Walks the packets of a concatenated payload, skipping empty ones.
#[derive(Debug, Clone)]
pub(crate) struct PacketStream<'a> {
    reader: ApiReader<'a>,
}

impl<'a> PacketStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ApiReader::new(data),
        }
    }

    pub fn next_packet(&mut self) -> Result<Option<Packet<'a>>, DecodeError> {
        loop {
            if self.reader.is_empty() {
                return Ok(None);
            }
            let header = self.reader.get_raw(PACKET_HEADER_LEN)?;
            let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
            let payload = self.reader.get_raw(len)?;
            if !payload.is_empty() {
                return Ok(Some(Packet {
                    sequence: header[3],
                    payload,
                }));
            }
        }
    }

    pub fn peek_packet(&self) -> Result<Option<Packet<'a>>, DecodeError> {
        self.clone().next_packet()
    }

    /// The next packet, which must exist.
    pub fn expect_packet(&mut self, what: &str) -> Result<Packet<'a>, DecodeError> {
        self.next_packet()?
            .ok_or_else(|| DecodeError::Malformed(format!("payload ended before {what}")))
    }
}

/// Little-endian cursor over one packet payload.
#[derive(Debug, Clone)]
pub(crate) struct PacketReader<'a> {
    inner: ApiReader<'a>,
}

impl<'a> PacketReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            inner: ApiReader::new(payload),
        }
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.inner.peek_u8()
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.inner.get_u8()
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.inner.get_raw(len).map(|_| ())
    }

    fn read_uint_le(&mut self, width: usize) -> Result<u64, DecodeError> {
        let bytes = self.inner.get_raw(width)?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(self.read_uint_le(2)? as u16)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_uint_le(4)? as u32)
    }

    pub fn read_lenenc_int(&mut self) -> Result<u64, DecodeError> {
        match self.read_u8()? {
            b @ 0..=0xfa => Ok(u64::from(b)),
            0xfc => self.read_uint_le(2),
            0xfd => self.read_uint_le(3),
            0xfe => self.read_uint_le(8),
            b => Err(DecodeError::InvalidLenenc(b)),
        }
    }

    pub fn read_lenenc_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_lenenc_int()?;
        let len = usize::try_from(len)
            .map_err(|_| DecodeError::Malformed(format!("string length {len} overflows")))?;
        self.inner.get_raw(len)
    }

    pub fn read_lenenc_str(&mut self) -> Result<String, DecodeError> {
        Ok(String::from_utf8(self.read_lenenc_bytes()?.to_vec())?)
    }

    pub fn skip_lenenc_str(&mut self) -> Result<(), DecodeError> {
        self.read_lenenc_bytes().map(|_| ())
    }

    /// Everything left in the packet as text.
    pub fn read_str_eof(&mut self) -> Result<String, DecodeError> {
        Ok(String::from_utf8(self.inner.get_rest().to_vec())?)
    }
}
