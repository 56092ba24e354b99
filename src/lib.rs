pub mod api;
pub mod cli;
pub mod client;
pub mod command;
pub mod config;
pub mod protocol;
pub mod sql;
pub mod value;

pub use api::{QueryResult, Search, SnippetOptions};
pub use cli::{PromptError, prompt};
pub use client::{Client, ClientError};
pub use config::{ClientConfig, ConfigError, ServerAddress};
pub use sql::{Column, ColumnType, ResultSet, SqlOutcome};
pub use value::{BsonField, BsonType, DocId, Value};
