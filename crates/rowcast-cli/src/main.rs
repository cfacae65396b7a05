//! Rowcast CLI
//!
//! Developer tool for checking table definitions and projecting JSON
//! lines into typed rows.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Rowcast - project loosely-structured JSON onto typed rows
#[derive(Parser)]
#[command(name = "rowcast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory or rowcast.yaml path
    #[arg(short, long, default_value = "rowcast.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Rowcast project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Compile every table definition without projecting anything
    Validate,

    /// List tables and their columns
    Tables,

    /// Project JSON lines through a table
    Project {
        /// Table to project into
        #[arg(short, long)]
        table: String,

        /// Input file (defaults to stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Emit `{"row": ..., "warnings": [...]}` instead of bare rows
        #[arg(long)]
        warnings: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for rows
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref())?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config)?;
        }
        Commands::Tables => {
            commands::tables::run(&cli.config)?;
        }
        Commands::Project {
            table,
            input,
            output,
            warnings,
        } => {
            commands::project::run(
                &cli.config,
                &table,
                input.as_deref(),
                output.as_deref(),
                warnings,
            )?;
        }
    }

    Ok(())
}
