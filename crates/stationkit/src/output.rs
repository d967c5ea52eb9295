use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A single-row command result.
pub trait Report: Serialize {
    /// Column names, in row order.
    fn columns(&self) -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

pub fn print_report<R: Report>(report: &R, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(report.columns().to_vec())
                .add_row(report.row());
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", pretty_line(report)),
    }
}

fn pretty_line<R: Report>(report: &R) -> String {
    report
        .columns()
        .iter()
        .zip(report.row())
        .map(|(column, value)| format!("{}={value}", column.to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        station: &'static str,
        valid: bool,
    }

    impl Report for Sample {
        fn columns(&self) -> &'static [&'static str] {
            &["STATION", "VALID"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.station.to_string(), self.valid.to_string()]
        }
    }

    #[test]
    fn pretty_line_pairs_columns() {
        let sample = Sample {
            station: "orders",
            valid: false,
        };
        assert_eq!(pretty_line(&sample), "station=orders valid=false");
    }

    #[test]
    fn preview_marks_binary() {
        assert_eq!(payload_preview(b"{}"), "{}");
        assert_eq!(payload_preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }
}
