use crate::protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request};

/// Daemon status variables, or the meta of the last query when `global` is
/// false.
#[derive(Debug, Clone, Copy)]
pub struct Status {
    pub global: bool,
}

impl Request for Status {
    fn command(&self) -> Command {
        Command::Status
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_bool_dword(self.global);
    }
}

impl Query for Status {
    /// Name/value pairs in the order the daemon sent them.
    type Output = Vec<(String, String)>;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<Self::Output, DecodeError> {
        let rows = reader.get_len()?;
        let _columns = reader.get_len()?;

        let mut out = Vec::new();
        for _ in 0..rows {
            let key = reader.get_string()?;
            let value = reader.get_string()?;
            out.push((key, value));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pairs_in_order() {
        let mut buf = Vec::new();
        let mut writer = ApiWriter::new(&mut buf);
        writer.put_u32(2);
        writer.put_u32(2);
        for s in ["uptime", "15", "connections", "3"] {
            writer.put_string(s);
        }

        let status = Status { global: true }
            .decode(&mut ApiReader::new(&buf))
            .unwrap();
        assert_eq!(
            status,
            vec![
                ("uptime".to_string(), "15".to_string()),
                ("connections".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn truncated_reply_is_an_error() {
        let buf = [0, 0, 0, 5, 0, 0, 0, 2];

        assert!(
            Status { global: false }
                .decode(&mut ApiReader::new(&buf))
                .is_err()
        );
    }
}
