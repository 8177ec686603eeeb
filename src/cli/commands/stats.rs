//! `ait stats` command - Registry counts

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::Context;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct StatsArgs {}

pub fn run(_args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let registry = ctx.registry()?;
    let stats = registry.stats()?;

    match global.format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "total": stats.total,
                "verified": stats.verified,
                "new": stats.new,
                "pending": stats.pending(),
            });
            println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            println!("total\tverified\tnew\tpending");
            println!(
                "{}\t{}\t{}\t{}",
                stats.total,
                stats.verified,
                stats.new,
                stats.pending()
            );
        }
        _ => {
            let percent = if stats.total > 0 {
                stats.verified as f64 * 100.0 / stats.total as f64
            } else {
                0.0
            };
            println!("{}", style(registry.describe()).dim());
            println!("  Total:     {}", style(stats.total).cyan());
            println!(
                "  Verified:  {} ({:.1}%)",
                style(stats.verified).green(),
                percent
            );
            println!("  New:       {}", style(stats.new).yellow());
            println!("  Pending:   {}", stats.pending());
        }
    }
    Ok(())
}
