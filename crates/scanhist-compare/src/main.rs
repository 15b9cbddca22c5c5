//! CLI entry point for the scanhist comparison engine.
//!
//! Report output goes to stdout (or `--output`); logs go to stderr.

use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use scanhist_core::{BookmarkId, ScanId};
use scanhist_store::{BookmarkStore, FileBookmarkStore, FileScanRepository, ScanRepository};

use scanhist_compare::config::{CompareConfig, OutputFormat};
use scanhist_compare::export;
use scanhist_compare::ComparisonService;

#[derive(Parser)]
#[command(name = "scanhist")]
#[command(about = "Compare recorded network scans and report what changed")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: scanhist).
    #[arg(short, long, default_value = "scanhist", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// List recorded scans, oldest first.
    Scans,
    /// Compare two or more scans.
    Compare {
        /// Comma-separated scan ids, e.g. 3,1,2.
        #[arg(long)]
        scans: String,
        /// summary, json, csv or markdown (default from config).
        #[arg(short, long)]
        format: Option<OutputFormat>,
        /// Write the report to a file instead of stdout.
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Classify hosts and ports between two scans (prints JSON).
    Pair {
        #[arg(long)]
        a: ScanId,
        #[arg(long)]
        b: ScanId,
    },
    /// Manage saved comparisons.
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },
}

#[derive(Subcommand)]
enum BookmarkAction {
    /// Save a set of scans to compare later.
    Add {
        #[arg(long)]
        scans: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// List bookmarks, most recently updated first.
    List,
    /// Show one bookmark as JSON.
    Show { id: BookmarkId },
    /// Replace a bookmark's note.
    Note { id: BookmarkId, text: String },
    /// Delete a bookmark.
    Rm { id: BookmarkId },
    /// Run the comparison saved in a bookmark.
    Open {
        id: BookmarkId,
        #[arg(short, long)]
        format: Option<OutputFormat>,
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = load_compare_config(&cli.config)?;

    match cli.command {
        Command::Scans => {
            let repo = FileScanRepository::new(&config.data_dir)?;
            let scans = repo.list_scans().await?;
            if scans.is_empty() {
                println!("No scans in {}", config.data_dir);
            }
            for scan in scans {
                println!(
                    "{:>6}  {}  {}  {}",
                    scan.id.0,
                    scan.start_time.format("%Y-%m-%d %H:%M:%S"),
                    scan.mode,
                    scan.target
                );
            }
        }
        Command::Compare {
            scans,
            format,
            output,
        } => {
            let ids = ScanId::parse_list(&scans)?;
            let format = format.unwrap_or(config.default_format);
            run_comparison(&config, &ids, format, output.as_deref()).await?;
        }
        Command::Pair { a, b } => {
            let repo = FileScanRepository::new(&config.data_dir)?;
            let service = ComparisonService::new(Arc::new(repo), config.cache_ttl());
            let pair = service.compare_pair(a, b).await?;
            println!("{}", serde_json::to_string_pretty(&pair)?);
        }
        Command::Bookmark { action } => {
            let store = FileBookmarkStore::new(&config.bookmark_dir)?;
            run_bookmark(&config, &store, &action).await?;
        }
    }

    Ok(())
}

async fn run_comparison(
    config: &CompareConfig,
    ids: &[ScanId],
    format: OutputFormat,
    output: Option<&str>,
) -> anyhow::Result<()> {
    if ids.len() < 2 {
        anyhow::bail!("At least two scan ids are required, e.g. --scans 1,2");
    }

    let repo = FileScanRepository::new(&config.data_dir)?;
    let service = ComparisonService::new(Arc::new(repo), config.cache_ttl());
    let result = service.compare(ids).await?.into_result()?;

    let rendered = export::render(&result, format, Utc::now())?;
    emit(&rendered, output)
}

async fn run_bookmark(
    config: &CompareConfig,
    store: &FileBookmarkStore,
    action: &BookmarkAction,
) -> anyhow::Result<()> {
    match action {
        BookmarkAction::Add { scans, note } => {
            let bookmark = store.create(ScanId::parse_list(scans)?, note)?;
            println!("{}", bookmark.id);
        }
        BookmarkAction::List => {
            for bookmark in store.list()? {
                let ids: Vec<String> = bookmark.scan_ids.iter().map(ScanId::to_string).collect();
                println!(
                    "{}  {}  [{}]  {}",
                    bookmark.id,
                    bookmark.updated_at.format("%Y-%m-%d %H:%M"),
                    ids.join(","),
                    bookmark.note
                );
            }
        }
        BookmarkAction::Show { id } => {
            let bookmark = store.get(*id)?;
            println!("{}", serde_json::to_string_pretty(&bookmark)?);
        }
        BookmarkAction::Note { id, text } => {
            store.update_note(*id, text)?;
        }
        BookmarkAction::Rm { id } => {
            store.delete(*id)?;
        }
        BookmarkAction::Open { id, format, output } => {
            let bookmark = store.get(*id)?;
            let format = format.unwrap_or(config.default_format);
            run_comparison(config, &bookmark.scan_ids, format, output.as_deref()).await?;
        }
    }
    Ok(())
}

fn emit(rendered: &str, output: Option<&str>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            tracing::info!(path, bytes = rendered.len(), "Report written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn load_compare_config(file_prefix: &str) -> anyhow::Result<CompareConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            // SCANHIST_COMPARE__CACHE_TTL_SECS -> compare.cache_ttl_secs
            config::Environment::with_prefix("SCANHIST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<CompareConfig>("compare") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(CompareConfig::default()),
        Err(e) => Err(e.into()),
    }
}
