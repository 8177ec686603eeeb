//! `ait init` command - Initialize a new inventory workspace

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_with_schema;
use crate::cli::GlobalOpts;
use crate::core::project::{Project, ProjectError};
use crate::core::registry::StoreLocator;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .ait/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Created directory {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    let project = match project {
        Ok(project) => project,
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} Inventory workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("ait init --force").yellow());
            return Ok(());
        }
        Err(e) => return Err(miette::miette!("{}", e)),
    };

    // Create the registry table where the workspace points
    let config = Config::load(Some(&project))?;
    let locator = match &global.database {
        Some(database) => database.parse::<StoreLocator>()?,
        None => config.registry_locator(Some(&project))?,
    };
    let registry = open_with_schema(&locator)?;

    if global.quiet {
        return Ok(());
    }

    println!(
        "{} Initialized inventory workspace at {}",
        style("✓").green(),
        style(project.root().display()).cyan()
    );
    println!(
        "{} Registry ready at {}",
        style("✓").green(),
        style(registry.describe()).cyan()
    );
    println!();
    println!("Next steps:");
    println!(
        "  {} Load the asset register",
        style("ait import register.csv").yellow()
    );
    println!("  {} Mark a scanned asset", style("ait verify CODE").yellow());
    println!("  {} See progress", style("ait stats").yellow());
    Ok(())
}
