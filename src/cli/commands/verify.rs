//! `ait verify` command - Mark a scanned asset as physically verified

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_code, Context};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Asset code as scanned
    pub code: String,

    /// Who verified it (default: `actor` from configuration)
    #[arg(long)]
    pub by: Option<String>,
}

pub fn run(args: VerifyArgs, global: &GlobalOpts) -> Result<()> {
    let code = parse_code(&args.code)?;
    let ctx = Context::load(global)?;
    let registry = ctx.registry()?;

    let actor = args
        .by
        .as_deref()
        .or(ctx.config.actor.as_deref())
        .map(str::trim)
        .filter(|a| !a.is_empty());

    registry.mark_verified_today(&code, actor)?;
    tracing::info!(code = %code, actor = actor.unwrap_or("-"), "asset verified");

    match global.format {
        OutputFormat::Json => {
            if let Some(record) = registry.get_by_code(&code)? {
                println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
            }
        }
        _ if global.quiet => {}
        _ => {
            println!(
                "{} Verified {}{}",
                style("✓").green(),
                style(&code).cyan(),
                actor
                    .map(|a| format!(" by {}", style(a).yellow()))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}
