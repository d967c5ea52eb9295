use serde::Serialize;
use stationkit_client::{internal_station_name, validate_name};

use crate::cmd::NameArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct NameReport {
    station: String,
    internal_name: String,
}

impl Report for NameReport {
    fn columns(&self) -> &'static [&'static str] {
        &["STATION", "INTERNAL"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.station.clone(), self.internal_name.clone()]
    }
}

pub fn run(args: NameArgs, format: OutputFormat) -> CliResult<i32> {
    validate_name("station", &args.station).map_err(|err| client_error("invalid station", err))?;
    let report = NameReport {
        internal_name: internal_station_name(&args.station),
        station: args.station,
    };
    print_report(&report, format);
    Ok(SUCCESS)
}
