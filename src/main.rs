//! # Editorial Import CLI (`edimport`)
//!
//! The `edimport` binary drives the import pipeline and inspects its output.
//!
//! ## Usage
//!
//! ```bash
//! edimport --config ./config/edimport.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `edimport import` | Rebuild every scraper result and save it to the store |
//! | `edimport check` | Report structural defects without writing anything |
//! | `edimport show <slug>` | Print one stored record and its content outline |
//! | `edimport export` | Dump all stored records and labels as JSON |
//! | `edimport stats` | Summarise what the store holds |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `warn`, which includes dropped pieces).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use editorial_core::tree::DanglingPolicy;
use editorial_import::progress::ProgressMode;
use editorial_import::{check, config, export, ingest, show, stats};

/// Editorial Import CLI: rebuilds editorial summaries from scraper output.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/edimport.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "edimport",
    about = "Editorial Import: rebuild editorial summaries from scraper output",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/edimport.toml")]
    config: PathBuf,

    /// Progress on stderr. Defaults to `human` when stderr is a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Import every scraper result into the output store.
    ///
    /// Each file is parsed, its piece list rebuilt into a content tree with
    /// fresh identifiers, and the record upserted. Re-importing an unchanged
    /// file leaves the stored record (and its identifiers) untouched.
    Import {
        /// Build everything but do not write to the store.
        #[arg(long)]
        dry_run: bool,

        /// Only import the first N files in discovery order.
        #[arg(long)]
        limit: Option<usize>,

        /// Override `import.concurrency` for this run.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Override `import.dangling` for this run: drop, warn or reject.
        #[arg(long, value_name = "POLICY")]
        dangling: Option<DanglingPolicy>,
    },

    /// Audit piece lists for duplicate ids, dangling parents and cycles.
    Check {
        /// Exit non-zero if any file has findings.
        #[arg(long)]
        strict: bool,
    },

    /// Show one stored record by slug.
    Show {
        /// Record slug, e.g. `Ada_Lovelace`.
        slug: String,
    },

    /// Export all stored records and labels as JSON.
    Export {
        /// Output file path. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show store statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    log::debug!("loaded config from {}", cli.config.display());

    match cli.command {
        Commands::Import {
            dry_run,
            limit,
            concurrency,
            dangling,
        } => {
            if concurrency == Some(0) {
                anyhow::bail!("--concurrency must be > 0");
            }
            let mode = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
            let options = ingest::ImportOptions {
                dry_run,
                limit,
                concurrency,
                dangling,
            };
            ingest::run_import(&cfg, &options, mode.reporter().as_ref()).await?;
        }
        Commands::Check { strict } => {
            check::run_check(&cfg, strict).await?;
        }
        Commands::Show { slug } => {
            show::run_show(&cfg, &slug).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
