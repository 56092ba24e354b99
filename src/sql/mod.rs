//! SphinxQL reply decoder.
//!
//! A SphinxQL request is answered with one opaque payload holding the
//! MySQL-protocol packets the daemon would have sent on its SQL port, one
//! statement after another. [`decode`] turns that payload into one
//! [`SqlOutcome`] per statement, in the order the statements were submitted.
//!
//! # Statement shapes
//!
//! - OK packet (`0x00`): a statement that changed something.
//! - Error packet (`0xff`): a statement that failed.
//! - EOF packet (`0xfe`, short): an empty outcome carrying warnings.
//! - Anything else starts a result set: a column count, one definition packet
//!   per column, an EOF packet, row packets, and a closing EOF packet.
//!
//! Row cells are sent as text. Each is converted to a [`Value`] according to
//! its column's [`ColumnType`].
mod packet;

use log::{debug, trace};

use crate::{protocol::DecodeError, value::Value};

use packet::{ERR_HEADER, NULL_MARKER, OK_HEADER, Packet, PacketStream};

/// Wire type of a result set column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Decimal,
    Long,
    Float,
    LongLong,
    Other(u8),
}

impl From<u8> for ColumnType {
    fn from(code: u8) -> Self {
        match code {
            0x00 => ColumnType::Decimal,
            0x03 => ColumnType::Long,
            0x04 => ColumnType::Float,
            0x08 => ColumnType::LongLong,
            code => ColumnType::Other(code),
        }
    }
}

impl ColumnType {
    pub fn code(self) -> u8 {
        match self {
            ColumnType::Decimal => 0x00,
            ColumnType::Long => 0x03,
            ColumnType::Float => 0x04,
            ColumnType::LongLong => 0x08,
            ColumnType::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Declared display length.
    pub length: u32,
    pub column_type: ColumnType,
    pub unsigned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    /// Every row holds exactly one value per column.
    pub rows: Vec<Vec<Value>>,
    pub warnings: u16,
}

/// Outcome of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlOutcome {
    Ok {
        affected_rows: u64,
        warnings: u16,
        message: String,
    },
    Error {
        code: u16,
        message: String,
    },
    Empty {
        warnings: u16,
    },
    ResultSet(ResultSet),
}

/// Decodes every statement outcome in a SphinxQL reply payload.
pub fn decode(payload: &[u8]) -> Result<Vec<SqlOutcome>, DecodeError> {
    let mut stream = PacketStream::new(payload);
    let mut outcomes = Vec::new();

    while let Some(packet) = stream.next_packet()? {
        let outcome = match packet.first() {
            Some(OK_HEADER) => decode_ok(packet)?,
            Some(ERR_HEADER) => decode_err(packet)?,
            _ if packet.is_eof() => SqlOutcome::Empty {
                warnings: decode_eof(packet)?.0,
            },
            _ => SqlOutcome::ResultSet(decode_result_set(packet, &mut stream)?),
        };
        trace!("decoded statement outcome: {outcome:?}");
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn decode_ok(packet: Packet<'_>) -> Result<SqlOutcome, DecodeError> {
    let mut reader = packet.reader();
    reader.skip(1)?;
    let affected_rows = reader.read_lenenc_int()?;
    let _last_insert_id = reader.read_lenenc_int()?;
    let _status = reader.read_u16_le()?;
    let warnings = reader.read_u16_le()?;
    let message = reader.read_str_eof()?;

    Ok(SqlOutcome::Ok {
        affected_rows,
        warnings,
        message,
    })
}

fn decode_err(packet: Packet<'_>) -> Result<SqlOutcome, DecodeError> {
    let mut reader = packet.reader();
    reader.skip(1)?;
    let code = reader.read_u16_le()?;
    let message = reader.read_str_eof()?;

    Ok(SqlOutcome::Error { code, message })
}

/// Returns `(warnings, status)`.
fn decode_eof(packet: Packet<'_>) -> Result<(u16, u16), DecodeError> {
    let mut reader = packet.reader();
    reader.skip(1)?;
    let warnings = reader.read_u16_le()?;
    let status = reader.read_u16_le()?;
    Ok((warnings, status))
}

fn decode_result_set<'a>(
    head: Packet<'a>,
    stream: &mut PacketStream<'a>,
) -> Result<ResultSet, DecodeError> {
    let count = head.reader().read_lenenc_int()?;
    let count = usize::try_from(count)
        .map_err(|_| DecodeError::Malformed(format!("column count {count} overflows")))?;

    let mut columns = Vec::new();
    for _ in 0..count {
        columns.push(decode_column(stream.expect_packet("column definition")?)?);
    }

    let eof = stream.expect_packet("end of column definitions")?;
    if !eof.is_eof() {
        return Err(DecodeError::Malformed(
            "expected EOF after column definitions".into(),
        ));
    }
    let (warnings, _) = decode_eof(eof)?;

    let mut rows = Vec::new();
    while let Some(packet) = stream.peek_packet()? {
        if packet.is_err() {
            // left for the caller, it is the next statement outcome
            break;
        }
        stream.next_packet()?;
        if packet.is_eof() {
            break;
        }
        rows.push(decode_row(packet, &columns)?);
    }

    Ok(ResultSet {
        columns,
        rows,
        warnings,
    })
}

fn decode_column(packet: Packet<'_>) -> Result<Column, DecodeError> {
    let mut reader = packet.reader();
    // catalog, schema, table, physical table
    for _ in 0..4 {
        reader.skip_lenenc_str()?;
    }
    let name = reader.read_lenenc_str()?;
    // physical name
    reader.skip_lenenc_str()?;
    // filler, charset
    reader.skip(1)?;
    reader.skip(2)?;
    let length = reader.read_u32_le()?;
    let column_type = ColumnType::from(reader.read_u8()?);
    let unsigned = reader.read_u16_le()? != 0;

    Ok(Column {
        name,
        length,
        column_type,
        unsigned,
    })
}

fn decode_row(packet: Packet<'_>, columns: &[Column]) -> Result<Vec<Value>, DecodeError> {
    let mut reader = packet.reader();
    let mut cells = Vec::with_capacity(columns.len());

    for column in columns {
        if reader.peek_u8() == Some(NULL_MARKER) {
            reader.skip(1)?;
            cells.push(Value::Null);
            continue;
        }
        let text = reader.read_lenenc_str()?;
        cells.push(convert_cell(text, column));
    }

    Ok(cells)
}

/// Converts a text cell by its column type. Text that does not parse as the
/// column's numeric type, such as a fractional DECIMAL or an empty cell, is
/// kept as [`Value::String`].
fn convert_cell(text: String, column: &Column) -> Value {
    let parsed = match (column.column_type, column.unsigned) {
        (ColumnType::Decimal | ColumnType::Long, false) => text.parse().map(Value::Int32).ok(),
        (ColumnType::Decimal | ColumnType::Long, true) => text.parse().map(Value::UInt32).ok(),
        (ColumnType::LongLong, false) => text.parse().map(Value::Int64).ok(),
        (ColumnType::LongLong, true) => text.parse().map(Value::UInt64).ok(),
        (ColumnType::Float, _) => text.parse().map(Value::Float).ok(),
        (ColumnType::Other(_), _) => return Value::String(text),
    };

    parsed.unwrap_or_else(|| {
        debug!(
            "cell '{text}' of column '{}' is not a {:?}, kept as text",
            column.name, column.column_type
        );
        Value::String(text)
    })
}
