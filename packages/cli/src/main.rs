mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, format, init, tree, CheckArgs, FormatArgs, InitArgs, TreeArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// FOMOD CLI - Inspect, validate and normalize mod installer packages
#[derive(Parser, Debug)]
#[command(name = "fomod")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to fomod-editor.json in the working directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new installer package
    Init(InitArgs),

    /// Validate a package and report missing resources
    Check(CheckArgs),

    /// Rewrite a package in canonical order and layout
    Format(FormatArgs),

    /// Print the node tree of a package
    Tree(TreeArgs),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let settings = config::load_settings(&cwd, cli.settings.as_deref());
            match cli.command {
                Command::Init(args) => init(args, &cwd, settings),
                Command::Check(args) => check(args, &cwd, settings),
                Command::Format(args) => format(args, &cwd),
                Command::Tree(args) => tree(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
