//! Connection to a searchd daemon.
//!
//! [`Client`] owns one socket and one reusable [`Buffer`]. It connects lazily
//! on the first request, and every call blocks until the whole reply has been
//! read or an error occurred.
//!
//! # Connection states
//!
//! - **Idle**: no socket. This is the initial state and the state after any
//!   transport failure.
//! - **Active**: socket open and handshake done.
//!
//! Before an Active connection is reused it is probed without blocking; if
//! the daemon has closed it in the meantime, the client silently reconnects.
//!
//! # Errors
//!
//! Transport failures close the socket. Errors reported by the daemon
//! ([`ClientError::Remote`], [`ClientError::Retry`]) and payload decode
//! failures leave the connection usable, since the whole reply frame was
//! consumed. Nothing is retried automatically.
//!
//! # Threads
//!
//! A `Client` is a single mutable resource: the buffer is shared by every
//! request on the connection. Use one client per thread.
use std::time::Duration;

use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::{
    api::{
        CallPq, Excerpts, FlushAttributes, Json, JsonAnswer, Keyword, Keywords, Persist, Ping,
        PqFlags, PqResponse, QueryResult, Search, SearchQueries, SnippetOptions, Sphinxql, Status,
        UpdateAttributes, UpdateRow, Uvar,
    },
    config::{ClientConfig, ConfigError, ServerAddress},
    protocol::{self, ApiReader, Buffer, DecodeError, ProtocolTransport, Query, Request, Stream},
    sql::SqlOutcome,
    value::DocId,
};

pub use crate::protocol::TransportError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode reply: {0}")]
    Decode(#[from] DecodeError),

    #[error("searchd error: {0}")]
    Remote(String),

    #[error("temporary searchd error: {0}")]
    Retry(String),

    #[error("unknown status code '{0}'")]
    UnknownStatus(u16),

    #[error("invalid arguments ({0})")]
    InvalidArgument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,
}

impl ClientError {
    /// True when the daemon reported a transient failure and the same request
    /// may be sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Retry(_))
    }
}

#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    transport: Option<ProtocolTransport<Stream>>,
    connect_error: bool,
    last_warning: String,
    buffer: Buffer,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let buffer = Buffer::new(config.max_alloc);
        Self {
            config,
            transport: None,
            connect_error: false,
            last_warning: String::new(),
            buffer,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Points the client at another daemon, see [`ServerAddress`] for the
    /// accepted forms. Takes effect on the next connection.
    pub fn set_server(&mut self, address: &str) -> Result<(), ClientError> {
        self.config.address = address.parse()?;
        Ok(())
    }

    pub fn set_address(&mut self, address: ServerAddress) {
        self.config.address = address;
    }

    pub fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.config.connect_timeout = timeout;
    }

    pub fn set_max_alloc(&mut self, max_alloc: usize) {
        self.config.max_alloc = max_alloc;
        self.buffer.set_max_alloc(max_alloc);
    }

    /// Replies declaring a longer payload fail with
    /// [`TransportError::ReplyTooLarge`] and close the connection.
    pub fn set_max_reply(&mut self, max_reply: usize) {
        self.config.max_reply = max_reply;
        if let Some(transport) = self.transport.as_mut() {
            transport.set_max_reply(max_reply);
        }
    }

    /// Warning attached to the last reply, or empty.
    pub fn last_warning(&self) -> &str {
        &self.last_warning
    }

    /// True when the last connection attempt failed on the client side.
    pub fn is_connect_error(&self) -> bool {
        self.connect_error
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    fn connect(&mut self) -> Result<(), ClientError> {
        if let Some(transport) = self.transport.as_mut() {
            match transport.stream_mut().is_closed() {
                Ok(false) => {
                    self.connect_error = false;
                    return Ok(());
                }
                Ok(true) => info!("connection closed by searchd, reconnecting"),
                Err(e) => info!("connection probe failed ({e}), reconnecting"),
            }
            self.transport = None;
        }

        let result = self.open_transport();
        self.connect_error = result.is_err();
        self.transport = Some(result?);
        Ok(())
    }

    fn open_transport(&self) -> Result<ProtocolTransport<Stream>, TransportError> {
        debug!("connecting to {}", self.config.address);
        let stream = Stream::connect(&self.config.address, self.config.connect_timeout)?;
        let mut transport = ProtocolTransport::new(stream);
        transport.set_max_reply(self.config.max_reply);
        transport.handshake()?;
        info!("connected to {}", self.config.address);
        Ok(transport)
    }

    /// Drops the socket after a transport failure.
    fn fail_close<T>(&mut self, err: TransportError) -> Result<T, ClientError> {
        warn!("closing connection: {err}");
        self.transport = None;
        Err(err.into())
    }

    fn write_request<R: Request>(&mut self, request: &R) -> Result<(), ClientError> {
        let command = request.command();
        let mut writer = self.buffer.writer();
        let offset = writer.begin_frame(command)?;
        request.encode(&mut writer);
        writer.finish_frame(offset)?;
        trace!(
            "sending {command} v{} ({} bytes)",
            command.version(),
            self.buffer.len()
        );

        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;
        if let Err(e) = transport.write_frame(self.buffer.as_slice()) {
            return self.fail_close(e);
        }
        Ok(())
    }

    /// Sends a request that the daemon does not answer.
    pub fn send<R: Request>(&mut self, request: &R) -> Result<(), ClientError> {
        self.connect()?;
        self.write_request(request)
    }

    /// Sends a request and decodes the daemon's answer.
    pub fn execute<Q: Query>(&mut self, query: &Q) -> Result<Q::Output, ClientError> {
        self.last_warning.clear();
        self.connect()?;
        self.write_request(query)?;

        let Some(transport) = self.transport.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        let header = match transport.read_frame(&mut self.buffer) {
            Ok(header) => header,
            Err(e) => return self.fail_close(e),
        };

        let mut reader = ApiReader::new(self.buffer.as_slice());
        match protocol::Status::try_from(header.status) {
            Ok(protocol::Status::Ok) => {}
            Ok(protocol::Status::Warning) => {
                self.last_warning = reader.get_string()?;
                warn!("searchd warning: {}", self.last_warning);
            }
            Ok(protocol::Status::Error) => return Err(ClientError::Remote(reader.get_string()?)),
            Ok(protocol::Status::Retry) => return Err(ClientError::Retry(reader.get_string()?)),
            Err(code) => return Err(ClientError::UnknownStatus(code)),
        }

        let ours = query.command().version();
        if header.version < ours.0 {
            self.last_warning = format!(
                "searchd command v.{} older than client's v.{}, some options might not work",
                protocol::CommandVersion(header.version),
                ours
            );
            warn!("{}", self.last_warning);
        }

        Ok(query.decode(&mut reader)?)
    }

    /// Opens a persistent connection, kept by the daemon across requests.
    pub fn open(&mut self) -> Result<(), ClientError> {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }
        self.send(&Persist)
    }

    pub fn close(&mut self) -> Result<(), ClientError> {
        match self.transport.take() {
            Some(_) => {
                debug!("connection to {} closed", self.config.address);
                Ok(())
            }
            None => Err(ClientError::NotConnected),
        }
    }

    pub fn ping(&mut self, cookie: u32) -> Result<u32, ClientError> {
        self.execute(&Ping { cookie })
    }

    /// Returns the flush tag.
    pub fn flush_attributes(&mut self) -> Result<u32, ClientError> {
        self.execute(&FlushAttributes)
    }

    pub fn status(&mut self, global: bool) -> Result<Vec<(String, String)>, ClientError> {
        self.execute(&Status { global })
    }

    pub fn sphinxql(&mut self, query: &str) -> Result<Vec<SqlOutcome>, ClientError> {
        self.execute(&Sphinxql {
            query: query.to_string(),
        })
    }

    pub fn json(&mut self, endpoint: &str, body: &str) -> Result<JsonAnswer, ClientError> {
        self.execute(&Json {
            endpoint: endpoint.to_string(),
            body: body.to_string(),
        })
    }

    pub fn upload_uvar(&mut self, name: &str, values: &[u64]) -> Result<u32, ClientError> {
        if name.is_empty() {
            return Err(ClientError::InvalidArgument("name must not be empty".into()));
        }
        self.execute(&Uvar {
            name: name.to_string(),
            values: values.to_vec(),
        })
    }

    pub fn build_keywords(
        &mut self,
        query: &str,
        index: &str,
        hits: bool,
    ) -> Result<Vec<Keyword>, ClientError> {
        if query.is_empty() {
            return Err(ClientError::InvalidArgument("query must not be empty".into()));
        }
        if index.is_empty() {
            return Err(ClientError::InvalidArgument("index must not be empty".into()));
        }
        self.execute(&Keywords {
            query: query.to_string(),
            index: index.to_string(),
            hits,
        })
    }

    /// Returns the number of documents updated.
    pub fn update_attributes(
        &mut self,
        index: &str,
        attrs: &[&str],
        values: Vec<(DocId, UpdateRow)>,
        ignore_nonexistent: bool,
    ) -> Result<u32, ClientError> {
        let request = UpdateAttributes {
            index: index.to_string(),
            attrs: attrs.iter().map(|a| a.to_string()).collect(),
            values,
            ignore_nonexistent,
        };
        request.validate().map_err(ClientError::InvalidArgument)?;
        self.execute(&request)
    }

    /// Runs a batch of searches in one request. A query that failed on the
    /// daemon is reported in its own [`QueryResult`], not as an error.
    pub fn run_queries(&mut self, searches: &[Search]) -> Result<Vec<QueryResult>, ClientError> {
        if searches.is_empty() {
            return Err(ClientError::InvalidArgument("no queries defined".into()));
        }
        self.execute(&SearchQueries(searches))
    }

    /// Runs one search. A warning attached to its result set becomes the last
    /// warning.
    pub fn run_query(&mut self, search: &Search) -> Result<QueryResult, ClientError> {
        let result = self
            .run_queries(std::slice::from_ref(search))?
            .pop()
            .ok_or_else(|| DecodeError::Malformed("search reply without a result set".into()))?;
        if !result.warning.is_empty() {
            self.last_warning.clone_from(&result.warning);
        }
        Ok(result)
    }

    /// Searches `index` (every index when `None`) with default settings. A
    /// failed result set is returned as an error.
    pub fn query(&mut self, query: &str, index: Option<&str>) -> Result<QueryResult, ClientError> {
        let result = self.run_query(&Search::new(query, index.unwrap_or("*")))?;
        match result.status {
            protocol::Status::Error => Err(ClientError::Remote(result.error)),
            protocol::Status::Retry => Err(ClientError::Retry(result.error)),
            _ => Ok(result),
        }
    }

    /// Returns one highlighted snippet per document.
    pub fn build_excerpts(
        &mut self,
        docs: &[&str],
        index: &str,
        words: &str,
        options: &SnippetOptions,
    ) -> Result<Vec<String>, ClientError> {
        if docs.is_empty() {
            return Err(ClientError::InvalidArgument("docs must not be empty".into()));
        }
        if index.is_empty() {
            return Err(ClientError::InvalidArgument("index must not be empty".into()));
        }
        if words.is_empty() {
            return Err(ClientError::InvalidArgument("words must not be empty".into()));
        }
        self.execute(&Excerpts {
            docs: docs.iter().map(|d| d.to_string()).collect(),
            index: index.to_string(),
            words: words.to_string(),
            options: options.clone(),
        })
    }

    /// Matches plain text documents against the queries stored in a
    /// percolate index.
    pub fn call_pq(
        &mut self,
        index: &str,
        docs: &[&str],
        flags: PqFlags,
        shift: i32,
    ) -> Result<PqResponse, ClientError> {
        if index.is_empty() {
            return Err(ClientError::InvalidArgument("index must not be empty".into()));
        }
        self.execute(&CallPq {
            index: index.to_string(),
            docs: docs.iter().map(|d| d.to_string()).collect(),
            flags,
            shift,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::{TcpListener, TcpStream},
        sync::mpsc,
        thread::{self, JoinHandle},
    };

    use super::*;

    /// Scripted daemon on a loopback port.
    fn daemon<F>(script: F) -> (ClientConfig, JoinHandle<()>)
    where
        F: FnOnce(TcpListener) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || script(listener));
        let config = ClientConfig {
            address: ServerAddress::tcp("127.0.0.1", port),
            connect_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        (config, handle)
    }

    fn accept(listener: &TcpListener, version: u32) -> TcpStream {
        let (mut stream, _) = listener.accept().unwrap();
        let mut hello = [0u8; 4];
        stream.read_exact(&mut hello).unwrap();
        assert_eq!(u32::from_be_bytes(hello), 1);
        stream.write_all(&version.to_be_bytes()).unwrap();
        stream
    }

    fn read_request(stream: &mut TcpStream) -> (u16, u16, Vec<u8>) {
        let mut header = [0u8; 8];
        stream.read_exact(&mut header).unwrap();
        let command = u16::from_be_bytes([header[0], header[1]]);
        let version = u16::from_be_bytes([header[2], header[3]]);
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let mut payload = vec![0u8; len as usize];
        stream.read_exact(&mut payload).unwrap();
        (command, version, payload)
    }

    fn write_reply(stream: &mut TcpStream, status: u16, version: u16, payload: &[u8]) {
        let mut out = Vec::new();
        out.extend_from_slice(&status.to_be_bytes());
        out.extend_from_slice(&version.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        stream.write_all(&out).unwrap();
    }

    fn string(s: &str) -> Vec<u8> {
        let mut out = (s.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    /// Answers one ping by echoing the cookie with the given status prefix.
    fn answer_ping(stream: &mut TcpStream, status: u16, version: u16, prefix: &[u8]) {
        let (command, _, cookie) = read_request(stream);
        assert_eq!(command, 9);
        let mut payload = prefix.to_vec();
        payload.extend_from_slice(&cookie);
        write_reply(stream, status, version, &payload);
    }

    #[test]
    fn ping_round_trip() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            let (command, version, payload) = read_request(&mut stream);
            assert_eq!((command, version), (9, 0x100));
            write_reply(&mut stream, 0, 0x100, &payload);
        });

        let mut client = Client::new(config);
        assert_eq!(client.ping(0xdead_beef).unwrap(), 0xdead_beef);
        assert!(client.is_connected());
        assert_eq!(client.last_warning(), "");
        handle.join().unwrap();
    }

    #[test]
    fn wrong_handshake_version_fails_the_connection() {
        let (config, handle) = daemon(|listener| {
            let _stream = accept(&listener, 2);
        });

        let mut client = Client::new(config);
        let err = client.ping(1).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Handshake { received: 2 })
        ));
        assert!(!client.is_connected());
        assert!(client.is_connect_error());
        handle.join().unwrap();
    }

    #[test]
    fn warning_is_recorded_and_reply_still_decoded() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            answer_ping(&mut stream, 3, 0x100, &string("index rotated"));
        });

        let mut client = Client::new(config);
        assert_eq!(client.ping(42).unwrap(), 42);
        assert_eq!(client.last_warning(), "index rotated");
        handle.join().unwrap();
    }

    #[test]
    fn error_and_retry_are_distinct() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            read_request(&mut stream);
            write_reply(&mut stream, 1, 0x100, &string("unknown index"));
            read_request(&mut stream);
            write_reply(&mut stream, 2, 0x100, &string("busy"));
            read_request(&mut stream);
            write_reply(&mut stream, 9, 0x100, &[]);
        });

        let mut client = Client::new(config);

        let err = client.ping(1).unwrap_err();
        assert!(matches!(&err, ClientError::Remote(m) if m == "unknown index"));
        assert!(!err.is_retryable());
        assert!(client.is_connected());

        let err = client.ping(1).unwrap_err();
        assert!(matches!(&err, ClientError::Retry(m) if m == "busy"));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "temporary searchd error: busy");

        let err = client.ping(1).unwrap_err();
        assert!(matches!(err, ClientError::UnknownStatus(9)));
        handle.join().unwrap();
    }

    #[test]
    fn older_command_version_is_a_warning() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            answer_ping(&mut stream, 0, 0x0ff, &[]);
        });

        let mut client = Client::new(config);
        assert_eq!(client.ping(5).unwrap(), 5);
        assert_eq!(
            client.last_warning(),
            "searchd command v.0.255 older than client's v.1.00, some options might not work"
        );
        handle.join().unwrap();
    }

    #[test]
    fn closed_persistent_connection_is_reestablished() {
        let (closed_tx, closed_rx) = mpsc::channel();
        let (config, handle) = daemon(move |listener| {
            let mut first = accept(&listener, 1);
            answer_ping(&mut first, 0, 0x100, &[]);
            drop(first);
            closed_tx.send(()).unwrap();

            let mut second = accept(&listener, 1);
            answer_ping(&mut second, 0, 0x100, &[]);
        });

        let mut client = Client::new(config);
        assert_eq!(client.ping(1).unwrap(), 1);

        closed_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(100));

        assert_eq!(client.ping(2).unwrap(), 2);
        assert!(client.is_connected());
        handle.join().unwrap();
    }

    #[test]
    fn live_connection_is_reused() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            for _ in 0..3 {
                answer_ping(&mut stream, 0, 0x100, &[]);
            }
        });

        let mut client = Client::new(config);
        for cookie in 0..3 {
            assert_eq!(client.ping(cookie).unwrap(), cookie);
        }
        handle.join().unwrap();
    }

    #[test]
    fn short_reply_closes_the_connection() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            read_request(&mut stream);
            let mut reply = vec![0, 0, 1, 0, 0, 0, 0, 10];
            reply.extend_from_slice(&[1, 2, 3, 4]);
            stream.write_all(&reply).unwrap();
        });

        let mut client = Client::new(config);
        let err = client.ping(1).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::ShortRead {
                length: 10,
                read: 4,
                ..
            })
        ));
        assert!(!client.is_connected());
        handle.join().unwrap();
    }

    #[test]
    fn oversized_reply_closes_the_connection() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            read_request(&mut stream);
            let mut reply = vec![0, 0, 1, 0];
            reply.extend_from_slice(&(512u32 * 1024 * 1024).to_be_bytes());
            stream.write_all(&reply).unwrap();
        });

        let mut client = Client::new(config);
        client.set_max_reply(1024);
        let err = client.ping(1).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::ReplyTooLarge {
                length: 536_870_912,
                limit: 1024
            })
        ));
        assert!(!client.is_connected());
        assert!(client.buffer.capacity() <= 1024);
        handle.join().unwrap();
    }

    #[test]
    fn truncated_payload_is_a_decode_error() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            read_request(&mut stream);
            write_reply(&mut stream, 0, 0x100, &[0, 1]);
        });

        let mut client = Client::new(config);
        let err = client.ping(1).unwrap_err();
        assert!(matches!(err, ClientError::Decode(DecodeError::UnexpectedEof { .. })));
        assert!(client.is_connected());
        handle.join().unwrap();
    }

    #[test]
    fn open_sends_persist_without_waiting() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            let (command, version, payload) = read_request(&mut stream);
            assert_eq!((command, version), (4, 0));
            assert_eq!(payload, vec![0, 0, 0, 1]);
        });

        let mut client = Client::new(config);
        client.open().unwrap();
        assert!(matches!(client.open(), Err(ClientError::AlreadyConnected)));
        client.close().unwrap();
        assert!(matches!(client.close(), Err(ClientError::NotConnected)));
        handle.join().unwrap();
    }

    #[test]
    fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut client = Client::default();
        client.set_server(&format!("127.0.0.1:{port}")).unwrap();
        assert!(matches!(
            client.ping(1),
            Err(ClientError::Transport(TransportError::Io(_)))
        ));
        assert!(client.is_connect_error());
    }

    #[test]
    fn sphinxql_reply_is_decoded() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            let (command, _, payload) = read_request(&mut stream);
            assert_eq!(command, 8);
            assert_eq!(payload, string("delete from rt where id=1"));
            write_reply(&mut stream, 0, 0x100, &[7, 0, 0, 1, 0, 1, 0, 2, 0, 0, 0]);
        });

        let mut client = Client::new(config);
        let outcomes = client.sphinxql("delete from rt where id=1").unwrap();
        assert_eq!(
            outcomes,
            vec![SqlOutcome::Ok {
                affected_rows: 1,
                warnings: 0,
                message: String::new(),
            }]
        );
        handle.join().unwrap();
    }

    #[test]
    fn invalid_arguments_fail_before_connecting() {
        let mut client = Client::default();
        client.set_server("127.0.0.1:1").unwrap();

        assert!(matches!(
            client.build_keywords("", "idx", false),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.update_attributes("idx", &[], vec![], false),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(!client.is_connect_error());
    }

    #[test]
    fn large_reply_does_not_pin_the_buffer() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            let (command, _, payload) = read_request(&mut stream);
            assert_eq!(command, 7);
            assert!(payload.is_empty());
            let mut reply = 12u32.to_be_bytes().to_vec();
            reply.extend(std::iter::repeat_n(0u8, 4096));
            write_reply(&mut stream, 0, 0x100, &reply);
            answer_ping(&mut stream, 0, 0x100, &[]);
        });

        let mut client = Client::new(ClientConfig {
            max_alloc: 1024,
            ..config
        });
        assert_eq!(client.flush_attributes().unwrap(), 12);
        assert!(client.buffer.capacity() > 1024);

        assert_eq!(client.ping(3).unwrap(), 3);
        assert!(client.buffer.capacity() <= 1024);
        handle.join().unwrap();
    }

    /// An empty result set: no schema, no matches, 64-bit ids.
    fn empty_result(status: u32, message: Option<&str>) -> Vec<u8> {
        let mut out = status.to_be_bytes().to_vec();
        if let Some(message) = message {
            out.extend(string(message));
        }
        if status == 1 || status == 2 {
            return out;
        }
        for v in [0u32, 0, 0, 1, 0, 0, 0, 0] {
            out.extend(v.to_be_bytes());
        }
        out
    }

    #[test]
    fn search_batch_reports_per_query_status() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            let (command, version, payload) = read_request(&mut stream);
            assert_eq!((command, version), (0, 0x121));
            // agent flags, then the number of queries
            assert_eq!(&payload[..8], &[0, 0, 0, 0, 0, 0, 0, 2]);
            let mut reply = empty_result(1, Some("no such index"));
            reply.extend(empty_result(3, Some("slow")));
            write_reply(&mut stream, 0, 0x121, &reply);

            let (_, _, payload) = read_request(&mut stream);
            assert_eq!(&payload[4..8], &[0, 0, 0, 1]);
            write_reply(&mut stream, 0, 0x121, &empty_result(3, Some("slow")));
        });

        let mut client = Client::new(config);
        let searches = [Search::new("a", "missing"), Search::new("b", "rt")];
        let results = client.run_queries(&searches).unwrap();
        assert_eq!(results[0].status, protocol::Status::Error);
        assert_eq!(results[0].error, "no such index");
        assert_eq!(results[1].warning, "slow");
        assert_eq!(client.last_warning(), "");

        let result = client.run_query(&searches[1]).unwrap();
        assert!(result.id64);
        assert_eq!(client.last_warning(), "slow");
        handle.join().unwrap();

        assert!(matches!(
            client.run_queries(&[]),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn failed_query_is_an_error() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            let (_, _, payload) = read_request(&mut stream);
            let indexes = b"\x00\x00\x00\x01*";
            assert!(payload.windows(indexes.len()).any(|w| w == indexes));
            write_reply(&mut stream, 0, 0x121, &empty_result(1, Some("bad query")));
        });

        let mut client = Client::new(config);
        let err = client.query("@@", None).unwrap_err();
        assert_eq!(err.to_string(), "searchd error: bad query");
        assert!(client.is_connected());
        handle.join().unwrap();
    }

    #[test]
    fn excerpts_and_percolate_round_trip() {
        let (config, handle) = daemon(|listener| {
            let mut stream = accept(&listener, 1);
            let (command, version, _) = read_request(&mut stream);
            assert_eq!((command, version), (1, 0x104));
            let mut reply = string("<b>one</b>");
            reply.extend(string("two"));
            write_reply(&mut stream, 0, 0x104, &reply);

            let (command, _, payload) = read_request(&mut stream);
            assert_eq!(command, 17);
            assert_eq!(&payload[..4], &[0, 0, 0, 1]);
            let mut reply = vec![0, 0, 0, 1, 0, 0, 0, 1];
            reply.extend(5u64.to_be_bytes());
            reply.extend([0, 0, 0, 1, 0, 0, 0, 1]);
            reply.extend([0u8; 16]);
            reply.extend([0u8; 24]);
            reply.extend([0u8; 4]);
            reply.extend(string(""));
            write_reply(&mut stream, 0, 0x100, &reply);
        });

        let mut client = Client::new(config);
        let snippets = client
            .build_excerpts(&["one", "two"], "rt", "one", &SnippetOptions::default())
            .unwrap();
        assert_eq!(snippets, vec!["<b>one</b>", "two"]);

        let resp = client.call_pq("pq", &["one"], PqFlags::NEED_DOCS, 0).unwrap();
        assert_eq!(resp.queries[0].query_id, 5);
        assert_eq!(resp.queries[0].docs, Some(crate::api::PqDocs::Ordinals(vec![1])));
        handle.join().unwrap();

        let opts = SnippetOptions::default();
        let cases: [(&[&str], &str, &str); 3] =
            [(&[], "rt", "w"), (&["d"], "", "w"), (&["d"], "rt", "")];
        for (docs, index, words) in cases {
            assert!(matches!(
                client.build_excerpts(docs, index, words, &opts),
                Err(ClientError::InvalidArgument(_))
            ));
        }
    }

    #[cfg(unix)]
    #[test]
    fn unix_socket_transport() {
        use std::os::unix::net::UnixListener;
        use tempdir::TempDir;

        let dir = TempDir::new("searchd").unwrap();
        let path = dir.path().join("searchd.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut hello = [0u8; 4];
            stream.read_exact(&mut hello).unwrap();
            stream.write_all(&1u32.to_be_bytes()).unwrap();

            let mut header = [0u8; 8];
            stream.read_exact(&mut header).unwrap();
            let mut cookie = [0u8; 4];
            stream.read_exact(&mut cookie).unwrap();
            stream.write_all(&[0, 0, 1, 0, 0, 0, 0, 4]).unwrap();
            stream.write_all(&cookie).unwrap();
        });

        let mut client = Client::default();
        client.set_server(&format!("unix://{}", path.display())).unwrap();
        assert_eq!(client.ping(11).unwrap(), 11);
        handle.join().unwrap();
    }
}
