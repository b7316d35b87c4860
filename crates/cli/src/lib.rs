//! Operator front-end for the docshelf cache and search engine.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docshelf_core::{AppConfig, CacheDb, CacheStore};
use docshelf_search::{MemoryTextLayer, NormalizedKeyword, SearchConfig, SearchSession};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "docshelf")]
#[command(about = "Document cache and in-document search")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Cache the contents of a file under an id.
    Put {
        id: String,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Fetch a cached document. Exits non-zero on a miss.
    Get {
        id: String,
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Emit the base64 form instead of decoded bytes.
        #[arg(long)]
        base64: bool,
    },
    /// Remove one document from the cache.
    Rm { id: String },
    /// Print cache occupancy as JSON.
    Stats,
    /// Remove every cached document.
    Clear,
    /// Search a text file (form feeds separate pages) and print matches as JSON.
    Find {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        keyword: String,
        #[arg(long)]
        match_case: bool,
        #[arg(long)]
        whole_words: bool,
    },
}

#[derive(Debug, Serialize)]
struct RemoveOutput<'a> {
    id: &'a str,
    removed: bool,
}

/// One match, with 1-based page, line, and column for display.
#[derive(Debug, Serialize)]
struct FindHit {
    index: usize,
    page: usize,
    line: usize,
    column: usize,
    text: String,
    current: bool,
}

#[derive(Debug, Serialize)]
struct FindOutput {
    keyword: String,
    pages: usize,
    match_count: usize,
    matches: Vec<FindHit>,
}

pub async fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = AppConfig::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Put { id, file } => run_put(&config, &id, &file).await,
        Commands::Get { id, output, base64 } => run_get(&config, &id, output.as_deref(), base64).await,
        Commands::Rm { id } => run_rm(&config, &id).await,
        Commands::Stats => run_stats(&config).await,
        Commands::Clear => run_clear(&config).await,
        Commands::Find { file, keyword, match_case, whole_words } => {
            run_find(&config, &file, &keyword, match_case, whole_words)
        }
    }
}

async fn open_cache(config: &AppConfig) -> Result<CacheStore> {
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database {}", config.db_path.display()))?;
    let db = Arc::new(db);
    let cache = CacheStore::open(config.cache_config(), db.clone(), db).await.context("failed to open cache")?;
    Ok(cache)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

async fn run_put(config: &AppConfig, id: &str, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let cache = open_cache(config).await?;
    cache.try_put(id, &bytes).await.with_context(|| format!("failed to cache {id}"))?;
    let stats = cache.stats().await;
    cache.close();
    print_json(&stats)
}

async fn run_get(config: &AppConfig, id: &str, output: Option<&Path>, base64: bool) -> Result<()> {
    let cache = open_cache(config).await?;
    let encoded = cache.try_get(id).await.with_context(|| format!("failed to read {id}"))?;
    cache.close();
    let Some(encoded) = encoded else {
        anyhow::bail!("not cached: {id}");
    };

    let payload = if base64 {
        encoded.into_bytes()
    } else {
        cache.codec().decode(&encoded).context("cached form is not valid base64")?
    };

    match output {
        Some(path) => std::fs::write(path, &payload).with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&payload)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn run_rm(config: &AppConfig, id: &str) -> Result<()> {
    let cache = open_cache(config).await?;
    let removed = cache.remove(id).await;
    cache.close();
    print_json(&RemoveOutput { id, removed })
}

async fn run_stats(config: &AppConfig) -> Result<()> {
    let cache = open_cache(config).await?;
    print_json(&cache.stats().await)
}

async fn run_clear(config: &AppConfig) -> Result<()> {
    let cache = open_cache(config).await?;
    cache.clear().await;
    let stats = cache.stats().await;
    cache.close();
    print_json(&stats)
}

fn run_find(config: &AppConfig, file: &Path, keyword: &str, match_case: bool, whole_words: bool) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;

    let layer = MemoryTextLayer::from_text(&text);
    let pages = layer.page_count();
    let mut session = SearchSession::new(layer, &SearchConfig::from(config));
    session.set_page_count(pages);
    session.apply_keyword(NormalizedKeyword::new(keyword, match_case, whole_words));

    let current = session.current_index();
    let mut matches = Vec::with_capacity(session.matches().len());
    for (index, m) in session.matches().iter().enumerate() {
        let location = session
            .span_of(m)
            .and_then(|span| session.layer().locate(span))
            .context("match lost its highlight")?;
        matches.push(FindHit {
            index,
            page: location.page + 1,
            line: location.line + 1,
            column: location.column + 1,
            text: location.text,
            current: current == Some(index),
        });
    }

    print_json(&FindOutput { keyword: keyword.to_string(), pages, match_count: matches.len(), matches })
}
