//! CLI utilities for the searchd client.
//!
//! The utilities present in this module can be used to build an interactive shell on
//! top of [`Client`](crate::Client).
use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::command::{Command, CommandError};

#[derive(Debug, Error)]
pub enum PromptError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("end of input")]
    Eof,
}

/// Prompt user for a valid command.
///
/// End of input is reported as [`PromptError::Eof`] so callers can leave their loop.
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> Result<Command, PromptError>
where
    R: BufRead,
    W: Write,
{
    let mut s = String::default();
    write!(&mut writer, "> ")?;
    writer.flush()?;

    if reader.read_line(&mut s)? == 0 {
        return Err(PromptError::Eof);
    }

    let command: Command = s.as_str().try_into()?;
    Ok(command)
}
