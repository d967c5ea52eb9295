use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use stationkit_schema::SchemaFormat;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod check;
pub mod name;
#[cfg(feature = "nats")]
pub mod produce;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a payload against a schema file offline.
    Check(CheckArgs),
    /// Print the internal name of a station.
    Name(NameArgs),
    /// Produce one message through a live broker.
    #[cfg(feature = "nats")]
    Produce(ProduceArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Check(args) => check::run(args, format),
        Command::Name(args) => name::run(args, format),
        #[cfg(feature = "nats")]
        Command::Produce(args) => produce::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    /// Payload bytes. Empty when no source is given.
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(json) = &self.json {
            serde_json::from_str::<serde_json::Value>(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
            return Ok(json.as_bytes().to_vec());
        }
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema definition file.
    #[arg(long, value_name = "FILE")]
    pub schema: PathBuf,
    /// Schema type: json, graphql or protobuf.
    #[arg(long = "type", value_name = "TYPE", default_value = "json")]
    pub schema_type: SchemaFormat,
    /// Name to store the schema under. Defaults to the file stem.
    #[arg(long)]
    pub name: Option<String>,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    /// Station display name.
    pub station: String,
}

#[cfg(feature = "nats")]
#[derive(Args, Debug)]
pub struct ProduceArgs {
    /// Broker URL (e.g. nats://localhost:4222).
    #[arg(env = "STATIONKIT_URL")]
    pub url: String,
    /// Station to produce to.
    #[arg(long)]
    pub station: String,
    /// Producer name.
    #[arg(long, default_value = "stationkit-cli")]
    pub producer: String,
    /// Username reported to the broker.
    #[arg(long, default_value = "root")]
    pub username: String,
    /// Broker request timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "20s")]
    pub timeout: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg_attr(not(feature = "nats"), allow(dead_code))]
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
