use std::fmt;

/// Commands understood by the daemon, with their wire ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    Search = 0,
    Excerpt = 1,
    Update = 2,
    Keywords = 3,
    Persist = 4,
    Status = 5,
    FlushAttrs = 7,
    Sphinxql = 8,
    Ping = 9,
    Uvar = 11,
    Json = 16,
    CallPq = 17,
}

impl Command {
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// The command version this client speaks.
    pub const fn version(self) -> CommandVersion {
        CommandVersion(match self {
            Command::Search => 0x121,
            Command::Excerpt => 0x104,
            Command::Update => 0x103,
            Command::Keywords => 0x101,
            Command::Persist => 0,
            Command::Status => 0x101,
            Command::FlushAttrs
            | Command::Sphinxql
            | Command::Ping
            | Command::Uvar
            | Command::Json
            | Command::CallPq => 0x100,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Search => "search",
            Command::Excerpt => "excerpt",
            Command::Update => "update",
            Command::Keywords => "keywords",
            Command::Persist => "persist",
            Command::Status => "status",
            Command::FlushAttrs => "flushattrs",
            Command::Sphinxql => "sphinxql",
            Command::Ping => "ping",
            Command::Uvar => "uvar",
            Command::Json => "json",
            Command::CallPq => "callpq",
        };
        f.write_str(name)
    }
}

/// Command version, major in the high byte and minor in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandVersion(pub u16);

impl fmt::Display for CommandVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 >> 8, self.0 & 0xff)
    }
}
