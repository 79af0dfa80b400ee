//! h2o: Hashnode export to Obsidian vault converter

use anyhow::Result;
use clap::{Parser, Subcommand};
use h2o::config::{Config, LogFormat, DEFAULT_CONFIG_FILE};
use h2o::pipeline::RunOverrides;
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::{convert_export, init_config, inspect_export};

/// Exit status when the run finished but some posts failed
const EXIT_POSTS_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "h2o")]
#[command(about = "Convert a Hashnode blog export into an Obsidian vault")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an export into markdown notes
    Convert {
        /// Path to the Hashnode export (JSON)
        export: PathBuf,

        /// Output directory (overrides the config file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Convert at most this many posts
        #[arg(short, long)]
        limit: Option<usize>,

        /// Keep remote image links instead of downloading
        #[arg(long)]
        skip_images: bool,

        /// Use fallback tag names instead of querying the API
        #[arg(long)]
        skip_enrichment: bool,

        /// Hashnode API key (defaults to $HASHNODE_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Show what would be written without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Summarize an export without converting it
    Inspect {
        /// Path to the Hashnode export (JSON)
        export: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credentials may live in .env
    dotenvy::dotenv().ok();

    let config = Config::load_or_default(&cli.config)?;

    // Setup logging
    let log_level = config.logging.effective_level(cli.verbose);
    match config.logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_target(false)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command {
        Commands::Convert {
            export,
            output,
            limit,
            skip_images,
            skip_enrichment,
            api_key,
            dry_run,
            quiet,
        } => {
            let overrides = RunOverrides {
                output,
                limit,
                skip_images,
                skip_enrichment,
                api_key,
                dry_run,
                quiet,
            };
            let summary = convert_export(config, &export, overrides).await?;
            if summary.has_failures() {
                std::process::exit(EXIT_POSTS_FAILED);
            }
            Ok(())
        }
        Commands::Inspect { export, format } => inspect_export(export, format).await,
        Commands::Init { path, force } => init_config(path, force).await,
    }
}
