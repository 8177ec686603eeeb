//! `ait import` command - Load a spreadsheet into the registry

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::Context;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::import::{import_file, ImportOptions, ImportReport};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Asset register as a workbook (.xlsx, .xls, .ods) or a CSV export
    pub file: PathBuf,

    /// Worksheet to read from a workbook (default: the first one)
    #[arg(long, short = 's')]
    pub sheet: Option<String>,

    /// CSV field separator (default: detected from the header line)
    #[arg(long, short = 'd', value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,

    /// Report what would be inserted without writing
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("delimiter must be a single ASCII character, got '{}'", s)),
        },
    }
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if !args.file.exists() {
        return Err(miette::miette!("File not found: {}", args.file.display()));
    }

    let ctx = Context::load(global)?;
    let registry = ctx.registry()?;

    if !global.quiet && global.format != OutputFormat::Json {
        println!(
            "{} Importing {} into {}{}",
            style("→").blue(),
            style(args.file.display()).yellow(),
            style(registry.describe()).cyan(),
            if args.dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
        println!();
    }

    let options = ImportOptions {
        delimiter: args.delimiter,
        sheet: args.sheet,
        dry_run: args.dry_run,
    };
    let report = import_file(registry.as_ref(), &args.file, &options)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        _ if global.quiet => {}
        _ => print_summary(&report),
    }
    Ok(())
}

fn print_summary(report: &ImportReport) {
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows read:           {}", style(report.rows_read).cyan());
    let accepted_label = if report.dry_run { "Would insert" } else { "Inserted" };
    println!("  {:<21}{}", format!("{}:", accepted_label), style(report.accepted).green());
    println!(
        "  Already registered:  {}",
        style(report.ignored_existing).dim()
    );
    if report.dropped_duplicates > 0 {
        println!(
            "  Duplicate rows:      {}",
            style(report.dropped_duplicates).yellow()
        );
    }
    if report.dropped_empty > 0 {
        println!("  Rows without code:   {}", style(report.dropped_empty).yellow());
    }
    if report.invalid_cells > 0 {
        println!("  Unreadable cells:    {}", style(report.invalid_cells).yellow());
    }
    if !report.unmapped_headers.is_empty() {
        println!(
            "  Ignored columns:     {}",
            style(report.unmapped_headers.join(", ")).dim()
        );
    }
    if !report.skipped_columns.is_empty() {
        println!(
            "  Missing in registry: {}",
            style(report.skipped_columns.join(", ")).yellow()
        );
    }
    if report.dry_run {
        println!();
        println!("No changes made (dry run).");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("ñ").is_err());
    }
}
