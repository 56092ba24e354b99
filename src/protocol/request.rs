use super::{ApiReader, ApiWriter, Command, DecodeError};

/// A command payload that can be framed and sent to the daemon.
pub trait Request {
    fn command(&self) -> Command;

    /// Writes the command-specific payload. The frame header is handled by the
    /// caller.
    fn encode(&self, writer: &mut ApiWriter<'_>);
}

/// A request the daemon answers.
pub trait Query: Request {
    type Output;

    /// Decodes the reply payload, after any warning prefix has been consumed.
    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<Self::Output, DecodeError>;
}
