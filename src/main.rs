use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kitchen_queue::cli::args::{Cli, Commands};
use kitchen_queue::cli::commands::{self, Context};
use kitchen_queue::config::{Config, Paths};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let paths = match cli.root {
        Some(root) => Paths::with_root(root),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;
    config.general.color.apply();

    let ctx = Context {
        format: cli.output.unwrap_or(config.general.default_output),
        paths,
        config,
    };

    let output = match cli.command {
        Commands::Status => commands::status(&ctx)?,
        Commands::List { limit } => commands::list(&ctx, limit)?,
        Commands::Add(args) => commands::add(&ctx, args)?,
        Commands::Run => runtime()?.block_on(commands::run(&ctx))?,
        Commands::Clear { force } => commands::clear(&ctx, force)?,
        Commands::DeadLetter(args) => commands::dead_letter(&ctx, args.command)?,
        Commands::Watch => runtime()?.block_on(commands::watch(&ctx))?,
        Commands::Completions { shell } => commands::completions(shell)?,
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Logs go to stderr so command output stays pipeable. `RUST_LOG` wins over
/// `-v`.
fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Unable to set global default subscriber")
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
