//! REPL commands for the interactive client.
//!
//! This module defines the [`Command`] enum, which encapsulates what a user typed at
//! the prompt. Each command maps onto one [`Client`](crate::Client) call.
//!
//! # Overview
//! Lines starting with `.` are meta commands:
//!
//! - `.exit`: Close the session.
//! - `.ping [cookie]`: Round-trip a cookie through the daemon.
//! - `.status [global|meta]`: Daemon status variables, or meta of the last query.
//! - `.flush`: Flush attribute updates to disk.
//! - `.json <endpoint> <body>`: Pass a JSON request through the binary API.
//! - `.search <index> <query>`: Full-text search with default settings.
//!
//! Any other non-empty line is sent as a SphinxQL statement.
//!
//! # Example
//! ```rust
//! use searchd::command::Command;
//!
//! let cmd: Command = ".ping 7".try_into().unwrap();
//! assert_eq!(cmd, Command::Ping(7));
//! ```
use thiserror::Error;

/// List of possible errors when parsing a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),

    #[error("invalid '{command}' command, {reason}")]
    InvalidCommandArguments { command: String, reason: String },

    #[error("no command provided")]
    Empty,
}

/// User supplied commands to run against a searchd daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Close the connection and terminate the process.
    Exit,
    Ping(u32),
    /// `true` for daemon-wide status, `false` for last query meta.
    Status(bool),
    Flush,
    Json { endpoint: String, body: String },
    Search { index: String, query: String },
    /// SphinxQL statement, sent verbatim.
    Sql(String),
}

impl TryInto<Command> for &str {
    type Error = CommandError;

    fn try_into(self) -> Result<Command, Self::Error> {
        let line = self.trim();
        let (name, args) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, args)| (name, args.trim()));

        match name {
            "" => Err(CommandError::Empty),
            ".exit" => Ok(Command::Exit),
            ".flush" => Ok(Command::Flush),
            ".ping" if args.is_empty() => Ok(Command::Ping(0)),
            ".ping" => {
                let cookie = args.parse::<u32>().map_err(|_| {
                    CommandError::InvalidCommandArguments {
                        command: ".ping".to_string(),
                        reason: "cookie should be an unsigned 32-bit integer. Example: .ping 42"
                            .to_string(),
                    }
                })?;
                Ok(Command::Ping(cookie))
            }
            ".status" => match args {
                "" | "global" => Ok(Command::Status(true)),
                "meta" => Ok(Command::Status(false)),
                other => Err(CommandError::InvalidCommandArguments {
                    command: ".status".to_string(),
                    reason: format!("expected 'global' or 'meta', got '{other}'"),
                }),
            },
            ".json" => {
                let Some((endpoint, body)) = args.split_once(char::is_whitespace) else {
                    return Err(CommandError::InvalidCommandArguments {
                        command: ".json".to_string(),
                        reason: "requires an endpoint and a body. Example: .json json/search {}"
                            .to_string(),
                    });
                };
                Ok(Command::Json {
                    endpoint: endpoint.to_string(),
                    body: body.trim().to_string(),
                })
            }
            ".search" => {
                let Some((index, query)) = args.split_once(char::is_whitespace) else {
                    return Err(CommandError::InvalidCommandArguments {
                        command: ".search".to_string(),
                        reason: "requires an index and a query. Example: .search rt hello"
                            .to_string(),
                    });
                };
                Ok(Command::Search {
                    index: index.to_string(),
                    query: query.trim().to_string(),
                })
            }
            s if s.starts_with('.') => Err(CommandError::UnrecognizedCommand(s.to_string())),
            _ => Ok(Command::Sql(line.to_string())),
        }
    }
}
