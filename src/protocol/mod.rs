//! searchd binary API protocol.
//!
//! This module holds everything needed to talk to the daemon's API port short
//! of the individual commands: the primitive payload codec, the reusable
//! connection buffer, request/response framing, and the socket transport with
//! its version handshake.
//!
//! # Overview
//!
//! A conversation starts with a handshake: the client writes its 4-byte
//! protocol version and the daemon answers with its own, which must be `1`.
//! After that each request is a single frame and is answered by a single
//! frame, strictly in order.
//!
//! # Key Components
//!
//! - [`ApiWriter`] / [`ApiReader`]: big-endian primitives over a byte buffer.
//! - [`Buffer`]: the per-connection buffer that requests are built in and
//!   replies are read into.
//! - [`Request`] / [`Query`]: how a command describes its payload and reply.
//! - [`ProtocolTransport`]: framed exchange over a [`Stream`] (TCP or unix
//!   socket).
//!
//! # Binary Format
//!
//! - All integers are big-endian and fixed width.
//! - Strings and blobs carry a 32-bit length prefix.
//! - Reply status is one of [`Status`]; `Error` and `Retry` replies carry only
//!   a message, `Warning` replies carry a message followed by the normal
//!   reply.
//!
//! # See Also
//!
//! - [`sql`](crate::sql): decoder for the MySQL-style packets carried inside
//!   SphinxQL replies.
mod buffer;
mod codec;
mod command;
mod frame;
mod request;
mod transport;

pub use buffer::{Buffer, DEFAULT_MAX_ALLOC};
pub use codec::{ApiReader, ApiWriter, DecodeError};
pub use command::{Command, CommandVersion};
pub use frame::{
    DEFAULT_MAX_REPLY, HEADER_LEN, MAX_CHUNK_SIZE, RequestHeader, ResponseHeader, Status,
    read_frame,
};
pub use request::{Query, Request};
pub use transport::{
    CLIENT_PROTOCOL, ProtocolTransport, SEARCHD_PROTOCOL, Stream, TransportError,
};
