use std::fs;

use serde::Serialize;
use stationkit_schema::ValidatorRegistry;
use tracing::debug;

use crate::cmd::CheckArgs;
use crate::exit::{io_error, schema_error, schema_error_code, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct CheckReport {
    schema: String,
    #[serde(rename = "type")]
    format: &'static str,
    payload_size: usize,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Report for CheckReport {
    fn columns(&self) -> &'static [&'static str] {
        &["SCHEMA", "TYPE", "SIZE", "VALID", "ERROR"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.schema.clone(),
            self.format.to_string(),
            self.payload_size.to_string(),
            self.valid.to_string(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

/// Exit code is `SUCCESS` for a conforming payload and `DATA_INVALID` for a
/// rejected one. Schema load failures are errors.
pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let content = fs::read_to_string(&args.schema)
        .map_err(|err| io_error(&format!("failed reading {}", args.schema.display()), err))?;
    let name = args.name.clone().unwrap_or_else(|| schema_name(&args));
    let payload = args.payload.resolve()?;

    let registry = ValidatorRegistry::with_defaults()
        .map_err(|err| schema_error("validator setup failed", err))?;
    registry
        .parse_and_store(args.schema_type, &name, &content)
        .map_err(|err| schema_error("schema rejected", err))?;
    debug!(schema = %name, format = %args.schema_type, "schema loaded");

    let (code, error) = match registry.validate(args.schema_type, &payload, &name) {
        Ok(()) => (SUCCESS, None),
        Err(err) if err.is_validation_failure() => (schema_error_code(&err), Some(err.to_string())),
        Err(err) => return Err(schema_error("validation failed", err)),
    };

    let report = CheckReport {
        schema: name,
        format: args.schema_type.as_str(),
        payload_size: payload.len(),
        valid: error.is_none(),
        error,
    };
    print_report(&report, format);
    Ok(code)
}

/// `order.schema.json` and `order.json` both yield `order`.
fn schema_name(args: &CheckArgs) -> String {
    args.schema
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.trim_end_matches(".schema").to_string())
        .unwrap_or_else(|| "schema".to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use stationkit_schema::SchemaFormat;

    use super::*;
    use crate::cmd::PayloadArgs;

    fn args(path: &str) -> CheckArgs {
        CheckArgs {
            schema: PathBuf::from(path),
            schema_type: SchemaFormat::Json,
            name: None,
            payload: PayloadArgs::default(),
        }
    }

    #[test]
    fn schema_name_from_file_stem() {
        assert_eq!(schema_name(&args("/tmp/order.schema.json")), "order");
        assert_eq!(schema_name(&args("order.graphql")), "order");
        assert_eq!(schema_name(&args("/")), "schema");
    }
}
