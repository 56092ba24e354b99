use crate::protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request};

/// Passes an HTTP-style JSON request (`endpoint` such as `json/search`)
/// through the binary API.
#[derive(Debug, Clone)]
pub struct Json {
    pub endpoint: String,
    pub body: String,
}

/// Reply to [`Json`]. Errors are reported inside `answer`; there are no
/// numeric status codes as over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonAnswer {
    pub endpoint: String,
    pub answer: String,
}

impl Request for Json {
    fn command(&self) -> Command {
        Command::Json
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_string(&self.endpoint);
        writer.put_string(&self.body);
    }
}

impl Query for Json {
    type Output = JsonAnswer;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<JsonAnswer, DecodeError> {
        let endpoint = reader.get_string()?;
        let answer = reader.get_string()?;
        Ok(JsonAnswer { endpoint, answer })
    }
}
