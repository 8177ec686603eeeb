//! `ait list` command - List assets

use console::style;
use miette::Result;

use crate::cli::helpers::Context;
use crate::cli::table::render_records;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::registry::{ListFilter, StatusFilter, DEFAULT_LIST_LIMIT};

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Which assets to show (all, new, verified, unverified)
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Case-insensitive text matched against code or name
    #[arg(long)]
    pub search: Option<String>,

    /// Maximum number of assets (default: `list_limit` from configuration, else 2000)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let registry = ctx.registry()?;

    let filter = ListFilter {
        status: args.status,
        search: args.search,
        limit: args
            .limit
            .or(ctx.config.list_limit)
            .unwrap_or(DEFAULT_LIST_LIMIT),
    };
    let records = registry.list(&filter)?;

    print!("{}", render_records(&records, global.format)?);

    if global.format == OutputFormat::Auto {
        println!();
        if !global.quiet {
            println!(
                "{} asset(s) found  {}",
                style(records.len()).cyan(),
                style("✓ verified  + new  · pending").dim()
            );
        }
    }
    Ok(())
}
