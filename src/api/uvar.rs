use crate::protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request};

/// Uploads a named set of integers (a user variable) for use in filters.
///
/// The set goes over the wire sorted and de-duplicated, as deltas between
/// consecutive values, each delta as a little-endian base-128 varint. A zero
/// value is kept and goes out as a single `0x00` delta.
#[derive(Debug, Clone)]
pub struct Uvar {
    pub name: String,
    pub values: Vec<u64>,
}

impl Uvar {
    /// Returns the number of encoded values and the packed deltas.
    fn pack(&self) -> (usize, Vec<u8>) {
        let mut values = self.values.clone();
        values.sort_unstable();
        values.dedup();

        let mut blob = Vec::new();
        let mut prev = 0;
        for &value in &values {
            put_varint(&mut blob, value - prev);
            prev = value;
        }
        (values.len(), blob)
    }
}

fn put_varint(out: &mut Vec<u8>, mut val: u64) {
    loop {
        let byte = (val & 0x7f) as u8;
        val >>= 7;
        if val == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

impl Request for Uvar {
    fn command(&self) -> Command {
        Command::Uvar
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        let (count, blob) = self.pack();
        writer.put_string(&self.name);
        writer.put_len(count);
        writer.put_len(blob.len());
        writer.put_bytes(&blob);
    }
}

impl Query for Uvar {
    type Output = u32;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<u32, DecodeError> {
        reader.get_u32()
    }
}
