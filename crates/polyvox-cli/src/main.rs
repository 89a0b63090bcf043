//! Polyvox CLI - render songs and patches from the command line.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyvox")]
#[command(author, version, about = "Polyvox synthesis engine CLI", long_about = None)]
struct Cli {
    /// Log engine events at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a song file to WAV
    Render(commands::render::RenderArgs),

    /// Render one note of a patch to WAV
    Tone(commands::tone::ToneArgs),

    /// Show tracks, instruments, and timing of a song file
    Info(commands::info::InfoArgs),

    /// List factory patches or print one as TOML
    Patches(commands::patches::PatchesArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Tone(args) => commands::tone::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Patches(args) => commands::patches::run(args),
    }
}
