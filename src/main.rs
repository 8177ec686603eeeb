use ait::cli::{Cli, Commands, GlobalOpts};
use clap::Parser;
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => ait::cli::commands::init::run(args, &global),
        Commands::Import(args) => ait::cli::commands::import::run(args, &global),
        Commands::Migrate(args) => ait::cli::commands::migrate::run(args, &global),
        Commands::Show(args) => ait::cli::commands::show::run(args, &global),
        Commands::Verify(args) => ait::cli::commands::verify::run(args, &global),
        Commands::Add(args) => ait::cli::commands::add::run(args, &global),
        Commands::List(args) => ait::cli::commands::list::run(args, &global),
        Commands::Stats(args) => ait::cli::commands::stats::run(args, &global),
        Commands::Completions(args) => ait::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; `--verbose`/`--quiet` win over RUST_LOG
fn init_logging(global: &GlobalOpts) {
    let filter = if global.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else if global.quiet {
        tracing_subscriber::EnvFilter::new("error")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
