//! `ait migrate` command - Copy a registry into another store

use console::style;
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_with_schema, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::registry::{open_source_registry, StoreLocator};
use crate::import::migrate;

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    /// Source registry (default: the workspace SQLite file)
    #[arg(long)]
    pub from: Option<StoreLocator>,

    /// Target registry (default: the configured Postgres)
    #[arg(long)]
    pub to: Option<StoreLocator>,

    /// Report what would be written without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(args: MigrateArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;

    let source = match args.from {
        Some(locator) => locator,
        None => StoreLocator::Sqlite(ctx.config.sqlite_path(ctx.project.as_ref())?),
    };
    let target = match args.to {
        Some(locator) => locator,
        None => StoreLocator::Postgres(ctx.config.postgres_target()?),
    };
    if source == target {
        return Err(miette::miette!(
            "source and target are the same registry: {}",
            source
        ));
    }

    // The source may be a legacy table; leave its schema alone
    let source_registry = open_source_registry(&source)?;
    let target_registry = open_with_schema(&target)?;

    if !args.dry_run && !args.yes {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Overwrite records in {} with those from {}?",
                target_registry.describe(),
                source_registry.describe()
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !proceed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let report = migrate(source_registry.as_ref(), target_registry.as_ref(), args.dry_run)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        _ if global.quiet => {}
        _ => {
            let verb = if report.dry_run { "Would write" } else { "Wrote" };
            println!(
                "{} {} {} record(s) from {} to {}",
                style("✓").green(),
                verb,
                style(report.written).cyan(),
                style(source_registry.describe()).yellow(),
                style(target_registry.describe()).yellow()
            );
            println!("  Read:                {}", report.read);
            if report.collapsed_duplicates > 0 {
                println!(
                    "  Duplicate codes:     {}",
                    style(report.collapsed_duplicates).yellow()
                );
            }
            if report.dry_run {
                println!();
                println!("No changes made (dry run).");
            }
        }
    }
    Ok(())
}
