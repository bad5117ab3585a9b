//! CLI for the sheetdrop invoice pipeline.

mod collaborators;
mod commands;
mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{account, invoices, mappings, process};

/// sheetdrop - extract invoice data from uploads and route it to spreadsheets
#[derive(Parser)]
#[command(name = "sheetdrop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the state file
    #[arg(short, long, global = true, default_value = "sheetdrop.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch of invoice files for a user
    Process(process::ProcessArgs),

    /// List a user's invoice records
    Invoices(invoices::InvoicesArgs),

    /// Manage per-sender vendor mappings
    Mappings(mappings::MappingsArgs),

    /// Manage user accounts and connected spreadsheets
    Account(account::AccountArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Process(args) => process::run(args, &cli.state),
        Commands::Invoices(args) => invoices::run(args, &cli.state),
        Commands::Mappings(args) => mappings::run(args, &cli.state),
        Commands::Account(args) => account::run(args, &cli.state),
    }
}
