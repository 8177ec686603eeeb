//! `ait add` command - Register a scanned code that is not in the registry

use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_code, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::record::NewAsset;
use crate::core::registry::InsertOutcome;

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Asset code as scanned
    pub code: String,

    /// Asset name
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Asset family
    #[arg(long)]
    pub family: Option<String>,

    /// Person responsible for the asset
    #[arg(long, short = 'r')]
    pub responsible: Option<String>,

    /// Facility where the asset was found
    #[arg(long)]
    pub facility: Option<String>,

    /// Prompt for the fields not given as flags
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

pub fn run(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let code = parse_code(&args.code)?;
    let ctx = Context::load(global)?;
    let registry = ctx.registry()?;

    let mut asset = NewAsset::new(code);
    asset.name = args.name;
    asset.family = args.family;
    asset.responsible = args.responsible;
    asset.facility = args.facility;

    if args.interactive {
        prompt_missing(&mut asset)?;
    }

    let outcome = registry.insert_new(&asset)?;

    match global.format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "code": asset.code,
                "outcome": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        }
        _ if global.quiet => {}
        _ => match outcome {
            InsertOutcome::Inserted => println!(
                "{} Registered {} as a new asset",
                style("✓").green(),
                style(&asset.code).cyan()
            ),
            InsertOutcome::AlreadyExists => println!(
                "{} {} is already registered; nothing changed",
                style("!").yellow(),
                style(&asset.code).cyan()
            ),
        },
    }
    Ok(())
}

fn prompt_missing(asset: &mut NewAsset) -> Result<()> {
    let theme = ColorfulTheme::default();
    println!("{} {}", style("New asset").bold(), style(&asset.code).cyan());

    for (label, slot) in [
        ("Name", &mut asset.name),
        ("Family", &mut asset.family),
        ("Responsible", &mut asset.responsible),
        ("Facility", &mut asset.facility),
    ] {
        if slot.is_some() {
            continue;
        }
        let value: String = Input::with_theme(&theme)
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        *slot = Some(value).filter(|v| !v.trim().is_empty());
    }
    Ok(())
}
