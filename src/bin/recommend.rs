//! Recommendation binary entry point.
//!
//! This binary provides a command-line interface over the recommendation
//! core: similar-books lookup, the precomputed Top-10 list, and an
//! interactive REPL. Output is a human-friendly table or machine-readable
//! JSON.
//!
//! # Examples
//!
//! Similar books for a title:
//! ```bash
//! recommend --model-dir model --query "harry potter"
//! ```
//!
//! Top-10 list as JSON:
//! ```bash
//! recommend --model-dir model --top10 --format json
//! ```
//!
//! Interactive mode with cover prefetch:
//! ```bash
//! recommend --model-dir model --interactive --prefetch-covers
//! ```

use anyhow::{Context, Result};
use book_recommend::{
    artifacts::{ArtifactCache, ArtifactPaths},
    covers::{CoverImage, CoverStore},
    models::{RecommendationRecord, TopEntry},
    recommend::{RecommendError, Recommender, SIMILAR_TOP_K, TOP_LIST_SIZE},
};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for results
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Recommendation CLI for the library catalog
#[derive(Parser, Debug)]
#[command(
    name = "recommend",
    version,
    about = "Recommend similar books or list the most popular ones",
    long_about = "Query the precomputed recommendation artifacts. Supports single-query, \
                  top-10, and interactive modes with flexible output formatting.

EXAMPLES:
  Similar books:
    recommend --model-dir model --query \"harry potter\"

  Top-10 list as JSON:
    recommend --model-dir model --top10 --format json

  Interactive mode:
    recommend --model-dir model --interactive"
)]
struct Args {
    /// Directory holding the model artifacts
    #[arg(long, value_name = "DIR")]
    model_dir: PathBuf,

    /// Supplementary catalog CSV for cover backfill
    #[arg(long, value_name = "FILE")]
    supplement: Option<PathBuf>,

    /// Book title to find similar books for
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["top10", "interactive"])]
    query: Option<String>,

    /// Show the Top-10 list instead of a similar-books lookup
    #[arg(long, conflicts_with = "interactive")]
    top10: bool,

    /// Number of results to return
    #[arg(long, value_name = "N")]
    top_k: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Download cover images for the shown results into the local cache
    #[arg(long)]
    prefetch_covers: bool,

    /// Cover cache directory (defaults to a per-user temp directory)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Format similar-book records as a pretty table
fn format_records_table(records: &[RecommendationRecord]) -> String {
    if records.is_empty() {
        return "No similar books found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Author").add_attribute(Attribute::Bold),
        Cell::new("Cover").add_attribute(Attribute::Bold),
    ]);

    for (idx, record) in records.iter().enumerate() {
        let cover = if record.image_url.is_empty() {
            Cell::new("-").fg(Color::DarkGrey)
        } else {
            Cell::new(truncate(&record.image_url, 48))
        };
        table.add_row(vec![
            Cell::new(format!("{}", idx + 1)),
            Cell::new(truncate(&record.title, 60)),
            Cell::new(truncate(&record.author, 40)),
            cover,
        ]);
    }

    table.to_string()
}

/// Format the Top-10 list as a pretty table
fn format_top_table(entries: &[TopEntry]) -> String {
    if entries.is_empty() {
        return "No books to show.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Author").add_attribute(Attribute::Bold),
        Cell::new("Votes").add_attribute(Attribute::Bold),
        Cell::new("Rating").add_attribute(Attribute::Bold),
    ]);

    for (idx, entry) in entries.iter().enumerate() {
        let rating_color = if entry.avg_rating >= 4.5 {
            Color::Green
        } else if entry.avg_rating >= 4.0 {
            Color::Cyan
        } else {
            Color::White
        };
        table.add_row(vec![
            Cell::new(format!("{}", idx + 1)),
            Cell::new(truncate(&entry.record.title, 60)),
            Cell::new(truncate(&entry.record.author, 40)),
            Cell::new(entry.num_ratings),
            Cell::new(format!("{:.2}", entry.avg_rating)).fg(rating_color),
        ]);
    }

    table.to_string()
}

/// Download covers for the shown records into the local cache
async fn prefetch_covers(store: &CoverStore, urls: &[String]) {
    let to_fetch: Vec<String> = urls.iter().filter(|u| !u.is_empty()).cloned().collect();
    if to_fetch.is_empty() {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("fetching {} covers...", to_fetch.len()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let covers = store.fetch_all(&to_fetch).await;
    let fetched = covers
        .iter()
        .filter(|c| matches!(c, CoverImage::Fetched(_)))
        .count();
    spinner.finish_with_message(format!(
        "covers: {} fetched, {} placeholder",
        fetched,
        covers.len() - fetched
    ));
}

/// Run one similar-books lookup and print the result
async fn run_query(
    recommender: &Recommender,
    cover_store: Option<&CoverStore>,
    query_text: &str,
    top_k: usize,
    format: &OutputFormat,
) -> Result<()> {
    let started = Instant::now();
    match recommender.recommend(query_text, top_k).await {
        Ok(result) => {
            debug!(elapsed = ?started.elapsed(), "recommendation complete");
            if result.matched.differs_from(query_text) {
                println!("Showing recommendations for: {}", result.matched.matched_title);
            }
            match format {
                OutputFormat::Table => println!("{}", format_records_table(&result.records)),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&result.records)
                        .with_context(|| "Failed to serialize results to JSON")?
                ),
            }
            if let Some(store) = cover_store {
                let urls: Vec<String> =
                    result.records.iter().map(|r| r.image_url.clone()).collect();
                prefetch_covers(store, &urls).await;
            }
            Ok(())
        }
        Err(RecommendError::TitleNotFound(q)) => {
            println!("No match for {q:?}. Try another title.");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to recommend for query: {query_text:?}")),
    }
}

/// Print the Top-K list
async fn run_top(
    recommender: &Recommender,
    cover_store: Option<&CoverStore>,
    k: usize,
    format: &OutputFormat,
) -> Result<()> {
    let entries = recommender
        .top(k)
        .await
        .with_context(|| "Failed to build the top list")?;

    match format {
        OutputFormat::Table => println!("{}", format_top_table(&entries)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&entries)
                .with_context(|| "Failed to serialize results to JSON")?
        ),
    }
    if let Some(store) = cover_store {
        let urls: Vec<String> = entries
            .iter()
            .map(|e| e.record.image_url.clone())
            .collect();
        prefetch_covers(store, &urls).await;
    }
    Ok(())
}

fn print_repl_help() {
    println!("Commands:");
    println!("  <title>         - Find similar books");
    println!("  /top10          - Show the Top-10 list");
    println!("  /top N          - Set number of similar results to N");
    println!("  /format table   - Use table output format");
    println!("  /format json    - Use JSON output format");
    println!("  /help           - Show this help");
    println!("  Ctrl+D or Ctrl+C - Exit");
}

/// Run interactive REPL mode
async fn run_interactive(
    recommender: Recommender,
    cover_store: Option<CoverStore>,
    mut top_k: usize,
    mut format: OutputFormat,
) -> Result<()> {
    println!("Interactive Book Recommendation");
    print_repl_help();
    println!();

    let mut rl = DefaultEditor::new().with_context(|| "Failed to create readline editor")?;

    loop {
        let readline = rl.readline("Recommend> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line).ok();

                if line.starts_with('/') {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    match parts[0] {
                        "/help" => print_repl_help(),
                        "/top10" => {
                            run_top(&recommender, cover_store.as_ref(), TOP_LIST_SIZE, &format)
                                .await?;
                        }
                        "/top" => {
                            if parts.len() != 2 {
                                eprintln!("Usage: /top N");
                                continue;
                            }
                            match parts[1].parse::<usize>() {
                                Ok(n) if n > 0 => {
                                    top_k = n;
                                    println!("Set top-k to {top_k}");
                                }
                                _ => eprintln!("Invalid number: must be a positive integer"),
                            }
                        }
                        "/format" => match parts.get(1).copied() {
                            Some("table") => {
                                format = OutputFormat::Table;
                                println!("Using table output");
                            }
                            Some("json") => {
                                format = OutputFormat::Json;
                                println!("Using JSON output");
                            }
                            _ => eprintln!("Usage: /format table|json"),
                        },
                        other => eprintln!("Unknown command: {other} (try /help)"),
                    }
                    continue;
                }

                run_query(&recommender, cover_store.as_ref(), line, top_k, &format).await?;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Bye.");
                break;
            }
            Err(e) => {
                eprintln!("Readline error: {e}");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let mut paths = ArtifactPaths::in_model_dir(&args.model_dir);
    if let Some(supplement) = args.supplement.clone() {
        paths = paths.with_supplement(supplement);
    }
    let recommender = Recommender::new(Arc::new(ArtifactCache::new(paths)));
    info!(model_dir = %args.model_dir.display(), "recommendation session starting");

    let cover_store = if args.prefetch_covers {
        let cache_dir = args
            .cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("book_reco_cache"));
        Some(
            CoverStore::new(cache_dir)
                .with_context(|| "Failed to initialize the cover cache")?,
        )
    } else {
        None
    };

    if args.interactive {
        let top_k = args.top_k.unwrap_or(SIMILAR_TOP_K);
        return run_interactive(recommender, cover_store, top_k, args.format).await;
    }

    if args.top10 {
        let k = args.top_k.unwrap_or(TOP_LIST_SIZE);
        return run_top(&recommender, cover_store.as_ref(), k, &args.format).await;
    }

    match &args.query {
        Some(query) => {
            let top_k = args.top_k.unwrap_or(SIMILAR_TOP_K);
            run_query(&recommender, cover_store.as_ref(), query, top_k, &args.format).await
        }
        None => {
            anyhow::bail!("Provide --query, --top10, or --interactive (see --help)")
        }
    }
}
