//! `ait show` command - Detail view of one asset

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_code, Context};
use crate::cli::table::state_marker;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::record::{AssetRecord, Field};
use crate::core::registry::RegistryError;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Asset code as scanned (case and surrounding spaces are ignored)
    pub code: String,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let code = parse_code(&args.code)?;
    let ctx = Context::load(global)?;
    let registry = ctx.registry()?;

    let record = registry
        .get_by_code(&code)?
        .ok_or(RegistryError::NotFound(code))?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&record).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", record.code),
        _ => print_detail(&record),
    }
    Ok(())
}

fn print_detail(record: &AssetRecord) {
    let state = record.state();
    println!(
        "{} {}  {}",
        state_marker(state),
        style(&record.code).cyan().bold(),
        style(state.as_str()).dim()
    );
    println!("{}", style("─".repeat(50)).dim());

    let width = Field::all()
        .iter()
        .map(|f| f.column().len())
        .max()
        .unwrap_or(0);

    for field in Field::all() {
        if let Some(value) = record.attributes.get(*field) {
            println!("{:<width$}  {}", field.column(), value, width = width);
        }
    }

    println!("{}", style("─".repeat(50)).dim());
    let verified = if record.verified {
        style("yes".to_string()).green()
    } else {
        style("no".to_string()).yellow()
    };
    println!("{:<width$}  {}", "verified", verified, width = width);
    if let Some(at) = &record.verified_at {
        println!("{:<width$}  {}", "verified_at", at, width = width);
    }
    if let Some(by) = &record.verified_by {
        println!("{:<width$}  {}", "verified_by", by, width = width);
    }
    if let Some(created) = &record.created_at {
        println!("{:<width$}  {}", "created_at", style(created).dim(), width = width);
    }
}
