use clap::Parser;
use std::{
    error::Error,
    io::{self, Write},
    time::Duration,
};

use searchd::{
    Client, ClientConfig, PromptError, ResultSet, SqlOutcome, command::Command, prompt,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon address: host[:port], [v6]:port, unix:///path or /path
    #[arg(short, long, default_value = "localhost:9312")]
    server: String,

    /// Connect timeout in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig {
        address: cli.server.parse()?,
        connect_timeout: cli.timeout_ms.map(Duration::from_millis),
        ..Default::default()
    };
    let mut client = Client::new(config);

    let stdin = io::stdin();
    let stdout = io::stdout();

    loop {
        let cmd = match prompt(stdin.lock(), stdout.lock()) {
            Ok(c) => c,
            Err(PromptError::Eof) => break,
            Err(PromptError::Io(e)) => return Err(e.into()),
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        if let Command::Exit = cmd {
            break;
        }

        let mut out = stdout.lock();
        if let Err(e) = run(&mut client, cmd, &mut out) {
            eprintln!("error: {e}");
        }
        if !client.last_warning().is_empty() {
            eprintln!("warning: {}", client.last_warning());
        }
    }

    Ok(())
}

fn run<W: Write>(client: &mut Client, cmd: Command, out: &mut W) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Exit => {}
        Command::Ping(cookie) => writeln!(out, "pong {}", client.ping(cookie)?)?,
        Command::Status(global) => {
            for (key, value) in client.status(global)? {
                writeln!(out, "{key:<24} {value}")?;
            }
        }
        Command::Flush => writeln!(out, "flush tag {}", client.flush_attributes()?)?,
        Command::Json { endpoint, body } => {
            let answer = client.json(&endpoint, &body)?;
            writeln!(out, "{}", answer.answer)?;
        }
        Command::Search { index, query } => {
            let result = client.query(&query, Some(&index))?;
            for m in &result.matches {
                writeln!(out, "{m}")?;
            }
            writeln!(
                out,
                "{} of {} matches in {:?}",
                result.total, result.total_found, result.query_time
            )?;
        }
        Command::Sql(query) => {
            for outcome in client.sphinxql(&query)? {
                print_outcome(out, &outcome)?;
            }
        }
    }
    Ok(())
}

fn print_outcome<W: Write>(out: &mut W, outcome: &SqlOutcome) -> io::Result<()> {
    match outcome {
        SqlOutcome::Ok {
            affected_rows,
            warnings,
            message,
        } => {
            writeln!(out, "Query OK, {affected_rows} rows affected, {warnings} warnings")?;
            if !message.is_empty() {
                writeln!(out, "{message}")?;
            }
        }
        SqlOutcome::Error { code, message } => writeln!(out, "ERROR {code}: {message}")?,
        SqlOutcome::Empty { warnings } => writeln!(out, "Empty set, {warnings} warnings")?,
        SqlOutcome::ResultSet(set) => print_result_set(out, set)?,
    }
    Ok(())
}

fn print_result_set<W: Write>(out: &mut W, set: &ResultSet) -> io::Result<()> {
    let header = set
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("\t");
    writeln!(out, "{header}")?;

    for row in &set.rows {
        let line = row
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(out, "{line}")?;
    }
    writeln!(out, "{} rows in set, {} warnings", set.rows.len(), set.warnings)
}
