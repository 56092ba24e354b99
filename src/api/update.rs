use crate::{
    protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request},
    value::DocId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum UpdateType {
    Int = 0,
    Mva = 1,
    String = 2,
    Json = 3,
}

/// New attribute values for one document, one entry per updated attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateRow {
    Int(Vec<i32>),
    Mva(Vec<Vec<u32>>),
    String(Vec<String>),
    Json(Vec<String>),
}

impl UpdateRow {
    pub fn kind(&self) -> UpdateType {
        match self {
            UpdateRow::Int(_) => UpdateType::Int,
            UpdateRow::Mva(_) => UpdateType::Mva,
            UpdateRow::String(_) => UpdateType::String,
            UpdateRow::Json(_) => UpdateType::Json,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UpdateRow::Int(v) => v.len(),
            UpdateRow::Mva(v) => v.len(),
            UpdateRow::String(v) | UpdateRow::Json(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        match self {
            UpdateRow::Int(values) => values.iter().for_each(|&v| writer.put_i32(v)),
            UpdateRow::Mva(sets) => {
                for set in sets {
                    writer.put_len(set.len());
                    set.iter().for_each(|&v| writer.put_u32(v));
                }
            }
            UpdateRow::String(values) | UpdateRow::Json(values) => {
                values.iter().for_each(|v| writer.put_string(v))
            }
        }
    }
}

/// Updates attributes of the given documents in place; answered with the
/// number of documents actually updated.
#[derive(Debug, Clone)]
pub struct UpdateAttributes {
    pub index: String,
    pub attrs: Vec<String>,
    pub values: Vec<(DocId, UpdateRow)>,
    /// Skip attributes missing from the index schema instead of warning.
    pub ignore_nonexistent: bool,
}

impl UpdateAttributes {
    /// Checks the arguments before anything is sent.
    pub fn validate(&self) -> Result<(), String> {
        if self.index.is_empty() {
            return Err("index must not be empty".into());
        }
        if self.attrs.is_empty() {
            return Err("attrs must not be empty".into());
        }
        let Some((_, first)) = self.values.first() else {
            return Err("values must not be empty".into());
        };

        let kind = first.kind();
        for (id, row) in &self.values {
            if row.kind() != kind {
                return Err(format!(
                    "document {id} mixes {:?} values into a {kind:?} update",
                    row.kind()
                ));
            }
            if row.len() != self.attrs.len() {
                return Err(format!(
                    "document {id} has {} values for {} attributes",
                    row.len(),
                    self.attrs.len()
                ));
            }
        }
        Ok(())
    }

    fn kind(&self) -> UpdateType {
        self.values
            .first()
            .map_or(UpdateType::Int, |(_, row)| row.kind())
    }
}

impl Request for UpdateAttributes {
    fn command(&self) -> Command {
        Command::Update
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        let kind = self.kind();

        writer.put_string(&self.index);
        writer.put_len(self.attrs.len());
        writer.put_bool_dword(self.ignore_nonexistent);
        for attr in &self.attrs {
            writer.put_string(attr);
            writer.put_u32(kind as u32);
        }

        writer.put_len(self.values.len());
        for (id, row) in &self.values {
            writer.put_docid(*id);
            row.encode(writer);
        }
    }
}

impl Query for UpdateAttributes {
    type Output = u32;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<u32, DecodeError> {
        reader.get_u32()
    }
}
