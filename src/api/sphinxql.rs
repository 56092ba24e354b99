use crate::{
    protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request},
    sql::{self, SqlOutcome},
};

/// One or more `;`-separated SphinxQL statements.
#[derive(Debug, Clone)]
pub struct Sphinxql {
    pub query: String,
}

impl Request for Sphinxql {
    fn command(&self) -> Command {
        Command::Sphinxql
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_string(&self.query);
    }
}

impl Query for Sphinxql {
    type Output = Vec<SqlOutcome>;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<Self::Output, DecodeError> {
        sql::decode(reader.get_rest())
    }
}
