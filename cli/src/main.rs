use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod context;
mod format;

/// acr-purge - delete or annotate stale tags and dangling manifests in a
/// container registry.
#[derive(Parser, Debug)]
#[command(name = "acr-purge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control colored output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    color: String,

    /// Result format: pretty, json
    #[arg(long, global = true)]
    output: Option<String>,

    /// Path to a settings YAML file (defaults to the platform config dir)
    #[arg(long, global = true, env = "ACR_PURGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete matching tags, and optionally the manifests they leave dangling.
    Purge(commands::purge::PurgeArgs),
    /// Attach a lifecycle-annotation artifact instead of deleting.
    Annotate(commands::annotate::AnnotateArgs),
    /// Print version information.
    Version,
}

fn main() {
    let cli = Cli::parse();

    let verbosity = context::VerbosityLevel::from_count(cli.verbose);
    let ctx = context::AppContext::build(
        format::ColorChoice::from(cli.color.as_str()),
        cli.output.as_deref().map(format::OutputFormat::from),
        verbosity,
        cli.config.as_deref(),
    );

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.tracing_level().to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let exit_code = match cli.command {
        Command::Purge(args) => commands::purge::run(&ctx, args),
        Command::Annotate(args) => commands::annotate::run(&ctx, args),
        Command::Version => {
            println!("acr-purge {}", acr_purge_core::version());
            0
        }
    };

    std::process::exit(exit_code);
}
