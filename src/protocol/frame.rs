//! Request and response envelopes.
//!
//! ```text
//! request:  | command u16 | version u16 | length u32 | payload |
//! response: | status  u16 | version u16 | length u32 | payload |
//! ```
//!
//! Headers are big-endian with fixed-width integers, which is exactly what
//! bincode produces under [`wire_config`], so they are derived rather than
//! hand-packed. The request length is not known until the payload is written,
//! so [`ApiWriter::begin_frame`] reserves it and [`ApiWriter::finish_frame`]
//! patches it in afterwards.
use std::{fmt, io::Read};

use bincode::{
    Decode, Encode,
    config::{BigEndian, Configuration, Fixint},
};
use log::trace;

use super::{ApiWriter, Buffer, Command, transport::TransportError};

pub const HEADER_LEN: usize = 8;

/// Upper bound on a single read while draining a reply payload.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024;

/// Default limit on the payload length a reply may declare, 64 MiB.
pub const DEFAULT_MAX_REPLY: usize = 64 * 1024 * 1024;

pub(crate) fn wire_config() -> Configuration<BigEndian, Fixint> {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct RequestHeader {
    pub command: u16,
    pub version: u16,
    pub length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct ResponseHeader {
    pub status: u16,
    pub version: u16,
    pub length: u32,
}

/// Reply status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    /// Success, command-specific reply follows.
    Ok = 0,
    /// Failure, a message follows.
    Error = 1,
    /// Transient failure, a message follows; the request may be resent.
    Retry = 2,
    /// Success, a warning message and then the command-specific reply follow.
    Warning = 3,
}

impl TryFrom<u16> for Status {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, u16> {
        match value {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Error),
            2 => Ok(Status::Retry),
            3 => Ok(Status::Warning),
            code => Err(code),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "ok",
            Status::Error => "error",
            Status::Retry => "retry",
            Status::Warning => "warning",
        };
        f.write_str(name)
    }
}

impl ApiWriter<'_> {
    /// Writes a request header with a zero length and returns the offset of
    /// the length field.
    pub fn begin_frame(&mut self, command: Command) -> Result<usize, TransportError> {
        let header = RequestHeader {
            command: command.id(),
            version: command.version().0,
            length: 0,
        };
        let start = self.len();
        bincode::encode_into_std_write(header, &mut *self.buf, wire_config())?;
        Ok(start + HEADER_LEN - 4)
    }

    /// Patches the number of bytes written after the length field at `offset`.
    pub fn finish_frame(&mut self, offset: usize) -> Result<(), TransportError> {
        let payload = self.len() - offset - 4;
        let length = u32::try_from(payload).map_err(|_| TransportError::FrameTooLarge(payload))?;
        self.buf[offset..offset + 4].copy_from_slice(&length.to_be_bytes());
        Ok(())
    }
}

/// Reads one response frame from `src`, leaving its payload in `buffer`.
///
/// A declared payload longer than `max_reply` is rejected before anything is
/// allocated for it, and the buffer only grows as payload bytes arrive.
pub fn read_frame<R: Read>(
    src: &mut R,
    buffer: &mut Buffer,
    max_reply: usize,
) -> Result<ResponseHeader, TransportError> {
    let read = read_chunked(src, buffer.resize(HEADER_LEN))?;
    if read == 0 {
        return Err(TransportError::EmptyResponse);
    }
    if read < HEADER_LEN {
        return Err(TransportError::TruncatedHeader(read));
    }

    let (header, _): (ResponseHeader, usize) =
        bincode::decode_from_slice(buffer.as_slice(), wire_config())?;
    trace!("response header: {header:?}");

    let length = header.length as usize;
    if length > max_reply {
        return Err(TransportError::ReplyTooLarge {
            length,
            limit: max_reply,
        });
    }

    let read = read_payload(src, buffer, length)?;
    if read != length {
        return Err(TransportError::ShortRead {
            status: header.status,
            version: header.version,
            length,
            read,
        });
    }

    Ok(header)
}

/// Reads up to `length` payload bytes into `buffer`, growing it one chunk at a
/// time. Returns the number of bytes read.
fn read_payload<R: Read>(
    src: &mut R,
    buffer: &mut Buffer,
    length: usize,
) -> std::io::Result<usize> {
    buffer.resize(0);
    let mut read = 0;
    while read < length {
        let end = length.min(read + MAX_CHUNK_SIZE);
        let result = src.read(&mut buffer.extend_to(end)[read..]);
        match result {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                buffer.truncate(read);
                return Err(e);
            }
        }
    }
    buffer.truncate(read);
    Ok(read)
}

/// Fills `dst` in reads of at most [`MAX_CHUNK_SIZE`] bytes, stopping early
/// only at end of stream. Returns the number of bytes read.
fn read_chunked<R: Read>(src: &mut R, dst: &mut [u8]) -> std::io::Result<usize> {
    let mut read = 0;
    while read < dst.len() {
        let end = dst.len().min(read + MAX_CHUNK_SIZE);
        match src.read(&mut dst[read..end]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}
