use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use smartbin::advice::{format_advice, parse_blocks};
use smartbin::history::{ClassificationRecord, HistoryStore, JsonFileStore};
use smartbin::SmartBinError;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB: &str = "data/db.json";
const LABEL_WIDTH: usize = 60;

#[derive(Parser)]
#[command(
    name = "smartbin",
    about = "Format waste-sorting advice and browse scan history",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format advice text as HTML
    Format {
        /// Input text file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output HTML file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the parsed blocks of advice text as JSON
    Blocks {
        /// Input text file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List recent scans
    History {
        /// History database file
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,

        /// Number of scans to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Render the advice of a stored scan
    Show {
        /// Record id
        id: String,

        /// History database file
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,

        /// Output HTML file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Format { input, output } => {
            let text = read_input(input.as_deref())?;
            let html = format_advice(text.as_str());
            write_output(output.as_deref(), &html)?;
        }

        Commands::Blocks { input } => {
            let text = read_input(input.as_deref())?;
            let blocks = parse_blocks(&text);
            debug!(count = blocks.len(), "parsed advice blocks");
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        }

        Commands::History { db, limit } => {
            let records = load_recent(&db, limit)?;
            if records.is_empty() {
                println!("No scans recorded yet.");
            }
            for record in &records {
                println!("{}", history_line(record));
            }
        }

        Commands::Show { id, db, output } => {
            if !db.exists() {
                bail!("History file not found: {}", db.display());
            }
            let store = JsonFileStore::open(&db)
                .with_context(|| format!("Failed to open {}", db.display()))?;
            let record = store
                .get(&id)?
                .ok_or_else(|| SmartBinError::RecordNotFound(id.clone()))?;
            let html = format_advice(record.advice_text());
            write_output(output.as_deref(), &html)?;
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn write_output(path: Option<&Path>, html: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Advice written to {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

fn load_recent(db: &Path, limit: usize) -> Result<Vec<ClassificationRecord>> {
    if !db.exists() {
        return Ok(Vec::new());
    }
    let store =
        JsonFileStore::open(db).with_context(|| format!("Failed to open {}", db.display()))?;
    Ok(store.list_recent(limit)?)
}

fn history_line(record: &ClassificationRecord) -> String {
    let model = if record.used_model.is_empty() {
        "-"
    } else {
        record.used_model.as_str()
    };
    format!(
        "{}  {}  {}  {}",
        record.id,
        record.timestamp.format("%Y-%m-%d %H:%M"),
        model,
        truncate(record.summary_label(), LABEL_WIDTH)
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
