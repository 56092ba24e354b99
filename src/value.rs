//! Values decoded from the daemon.
//!
//! Attribute and cell values arrive in several wire representations. They are
//! carried as a [`Value`] whose variant names the concrete type, so callers
//! match on it instead of downcasting.
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

/// Document identifier, sent as a plain big-endian `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocId(pub u64);

impl DocId {
    pub const MAX: DocId = DocId(u64::MAX);
}

impl From<u64> for DocId {
    fn from(value: u64) -> Self {
        DocId(value)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a typed JSON field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BsonType {
    Eof = 0,
    Int32,
    Int64,
    Double,
    String,
    StringVector,
    Int32Vector,
    Int64Vector,
    DoubleVector,
    MixedVector,
    Object,
    True,
    False,
    Null,
    Root,
}

impl TryFrom<u8> for BsonType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use BsonType::*;

        const TAGS: [BsonType; 15] = [
            Eof,
            Int32,
            Int64,
            Double,
            String,
            StringVector,
            Int32Vector,
            Int64Vector,
            DoubleVector,
            MixedVector,
            Object,
            True,
            False,
            Null,
            Root,
        ];
        TAGS.get(value as usize).copied().ok_or(value)
    }
}

/// A typed JSON field: the tag plus its still-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BsonField {
    pub kind: BsonType,
    pub blob: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    String(String),
    /// String attribute flagged by the daemon as a JSON document.
    Json(String),
    Bytes(Vec<u8>),
    Bson(BsonField),
    Timestamp(SystemTime),
    UInt32Set(Vec<u32>),
    Int64Set(Vec<i64>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer variants widened to `i64`; `None` for everything else and for
    /// unsigned 64-bit values that do not fit.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int32(v) => Some(i64::from(v)),
            Value::UInt32(v) => Some(i64::from(v)),
            Value::Int64(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Json(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "{v} (json)"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Bson(v) => write!(f, "<{:?}: {} bytes>", v.kind, v.blob.len()),
            Value::Timestamp(v) => {
                let secs = v.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
                write!(f, "{secs}")
            }
            Value::UInt32Set(v) => write!(f, "{v:?}"),
            Value::Int64Set(v) => write!(f, "{v:?}"),
        }
    }
}
