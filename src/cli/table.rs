//! Table formatting for asset listings
//!
//! Every list-style output goes through [`render_records`], so the
//! supported formats behave the same across commands:
//! - `auto` and `md` render a `tabled` table
//! - `tsv`, `csv` and `id` stay single-line per record for piping
//! - `json` and `yaml` serialize the full records

use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::record::{AssetRecord, AssetState, Field};

/// Widest a text cell gets in the interactive table
const MAX_CELL_WIDTH: usize = 40;

const HEADERS: [&str; 7] = [
    "", "CODE", "NAME", "FAMILY", "FACILITY", "RESPONSIBLE", "VERIFIED_AT",
];

/// Marker shown in the first column for each lifecycle state
pub fn state_marker(state: AssetState) -> &'static str {
    match state {
        AssetState::Verified => "✓",
        AssetState::ScannedUnknown => "+",
        AssetState::Imported => "·",
    }
}

fn row(record: &AssetRecord) -> Vec<String> {
    let text = |field| record.text(field).unwrap_or_default();
    vec![
        state_marker(record.state()).to_string(),
        record.code.to_string(),
        text(Field::Name),
        text(Field::Family),
        text(Field::Facility),
        text(Field::Responsible),
        record.verified_at.clone().unwrap_or_default(),
    ]
}

/// Render records in the requested format
pub fn render_records(records: &[AssetRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(records).into_diagnostic(),
        OutputFormat::Yaml => serde_yml::to_string(&records).into_diagnostic(),
        OutputFormat::Id => Ok(records
            .iter()
            .map(|r| format!("{}\n", r.code))
            .collect()),
        OutputFormat::Tsv => Ok(delimited(records, "\t", |s| s.replace(['\t', '\n'], " "))),
        OutputFormat::Csv => Ok(delimited(records, ",", |s| escape_csv(&s))),
        OutputFormat::Md => Ok(table(records, false).with(Style::markdown()).to_string()),
        OutputFormat::Auto => Ok(table(records, true).with(Style::sharp()).to_string()),
    }
}

fn delimited(records: &[AssetRecord], sep: &str, escape: impl Fn(String) -> String) -> String {
    let mut out = HEADERS[1..].join(sep).to_lowercase();
    out.push('\n');
    for record in records {
        let cells: Vec<String> = row(record).into_iter().skip(1).map(&escape).collect();
        out.push_str(&cells.join(sep));
        out.push('\n');
    }
    out
}

fn table(records: &[AssetRecord], truncate: bool) -> tabled::Table {
    let mut builder = Builder::default();
    builder.push_record(HEADERS);
    for record in records {
        let cells = row(record);
        if truncate {
            builder.push_record(cells.iter().map(|c| truncate_str(c, MAX_CELL_WIDTH)));
        } else {
            builder.push_record(cells);
        }
    }
    builder.build()
}
