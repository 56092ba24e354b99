use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use log::{debug, trace};
use thiserror::Error;

use crate::config::ServerAddress;

use super::{Buffer, ResponseHeader, frame};

/// Protocol version sent by the client during the handshake.
pub const CLIENT_PROTOCOL: u32 = 1;
/// Protocol version the daemon must answer with.
pub const SEARCHD_PROTOCOL: u32 = 1;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport io error: {0}")]
    Io(#[from] io::Error),

    #[error("wrong version num received: {received}")]
    Handshake { received: u32 },

    #[error("received zero-sized searchd response")]
    EmptyResponse,

    #[error("truncated searchd response header ({0} bytes)")]
    TruncatedHeader(usize),

    #[error(
        "failed to read searchd response (status={status}, ver={version}, len={length}, read={read})"
    )]
    ShortRead {
        status: u16,
        version: u16,
        length: usize,
        read: usize,
    },

    #[error("searchd response of {length} bytes exceeds the {limit} byte limit")]
    ReplyTooLarge { length: usize, limit: usize },

    #[error("request payload of {0} bytes does not fit a frame")]
    FrameTooLarge(usize),

    #[error("failed to encode header: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode header: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Socket to the daemon.
#[derive(Debug)]
pub enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    pub fn connect(address: &ServerAddress, timeout: Option<Duration>) -> io::Result<Self> {
        match address {
            ServerAddress::Tcp { host, port } => {
                let stream = match timeout {
                    Some(timeout) => connect_timeout((host.as_str(), *port), timeout)?,
                    None => TcpStream::connect((host.as_str(), *port))?,
                };
                stream.set_nodelay(true)?;
                Ok(Stream::Tcp(stream))
            }
            #[cfg(unix)]
            ServerAddress::Unix(path) => Ok(Stream::Unix(UnixStream::connect(path)?)),
            #[cfg(not(unix))]
            ServerAddress::Unix(path) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unix sockets are not available: {}", path.display()),
            )),
        }
    }

    /// Checks whether the peer has closed the connection without blocking.
    ///
    /// The socket is switched to non-blocking for a single probe read and
    /// switched back before returning. Pending bytes on an idle connection
    /// mean the stream is out of step with the protocol, so they count as
    /// closed as well.
    pub fn is_closed(&mut self) -> io::Result<bool> {
        self.set_nonblocking(true)?;
        let probe = self.probe();
        self.set_nonblocking(false)?;

        match probe {
            Ok(0) => Ok(true),
            Ok(n) => {
                debug!("{n} unexpected bytes pending on idle connection");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn probe(&mut self) -> io::Result<usize> {
        let mut one = [0u8; 1];
        match self {
            Stream::Tcp(s) => s.peek(&mut one),
            #[cfg(unix)]
            Stream::Unix(s) => s.read(&mut one),
        }
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.set_nonblocking(nonblocking),
            #[cfg(unix)]
            Stream::Unix(s) => s.set_nonblocking(nonblocking),
        }
    }
}

fn connect_timeout(address: impl ToSocketAddrs, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in address.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
    }))
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Stream::Unix(s) => s.flush(),
        }
    }
}

/// Framed exchange over a byte stream.
#[derive(Debug)]
pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    max_reply: usize,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            max_reply: frame::DEFAULT_MAX_REPLY,
        }
    }

    /// Limits the payload length a reply may declare.
    pub fn set_max_reply(&mut self, max_reply: usize) {
        self.max_reply = max_reply;
    }

    pub fn stream_mut(&mut self) -> &mut T {
        &mut self.stream
    }

    /// Sends the client protocol version and checks the daemon's answer.
    ///
    /// The client writes first; the daemon only answers once it has read the
    /// client version.
    pub fn handshake(&mut self) -> Result<(), TransportError> {
        let hello = bincode::encode_to_vec(CLIENT_PROTOCOL, frame::wire_config())?;
        self.stream.write_all(&hello)?;

        let mut answer = [0u8; 4];
        self.stream.read_exact(&mut answer)?;
        let (received, _): (u32, usize) =
            bincode::decode_from_slice(&answer, frame::wire_config())?;

        if received != SEARCHD_PROTOCOL {
            return Err(TransportError::Handshake { received });
        }
        debug!("handshake complete, protocol {received}");
        Ok(())
    }

    /// Writes a complete frame in one call.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        trace!("writing frame of {} bytes", frame.len());
        self.stream.write_all(frame)?;
        self.stream.flush()?;
        Ok(())
    }

    pub fn read_frame(&mut self, buffer: &mut Buffer) -> Result<ResponseHeader, TransportError> {
        frame::read_frame(&mut self.stream, buffer, self.max_reply)
    }
}
