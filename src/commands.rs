//! CLI command runners.
//!
//! Each `run_*` function opens a [`MediaManager`] for the duration of the
//! command, performs one operation, and prints plain-text tables to stdout.
//! The manager is dropped (and its connections released) when the function
//! returns, whether it succeeds or fails.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::manager::MediaManager;
use crate::models::{BackendRecord, Book, Source, VideoItem};
use crate::recommend::RecommendationEngine;

/// Emby reports runtimes in 100-nanosecond ticks.
const TICKS_PER_MINUTE: i64 = 600_000_000;

/// Format a runtime in ticks as `1h 52m` / `48m`.
pub fn format_runtime(ticks: i64) -> String {
    let minutes = ticks / TICKS_PER_MINUTE;
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Cut `s` to at most `max` characters, marking the cut with `...`.
pub fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn print_video(index: usize, item: &VideoItem) {
    let year = item
        .production_year
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    println!("{}. {}{}", index, item.name, year);
    if !item.item_type.is_empty() {
        println!("    type: {}", item.item_type);
    }
    if !item.genres.is_empty() {
        println!("    genres: {}", item.genres.join(", "));
    }
    if let Some(rating) = item.community_rating {
        println!("    rating: {:.1}", rating);
    }
    if let Some(ticks) = item.run_time_ticks {
        println!("    runtime: {}", format_runtime(ticks));
    }
    println!("    id: {}", item.id);
}

fn print_book(index: usize, book: &Book) {
    println!("{}. {}", index, book.title);
    if let Some(authors) = book.author_line() {
        println!("    by: {}", authors);
    }
    if let Some(series) = &book.series_name {
        println!("    series: {}", series);
    }
    if !book.categories.is_empty() {
        println!("    categories: {}", book.categories.join(", "));
    }
    if let Some(date) = &book.publish_date {
        println!("    published: {}", date);
    }
    println!("    id: {}", book.id);
}

/// `colh search`: query the selected backends and print results per source.
pub async fn run_search(config: &Config, query: &str, sources: &[Source]) -> Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    if sources.is_empty() {
        bail!("no sources selected");
    }

    let manager = MediaManager::connect(config)?;
    let results = manager.search_all(query, sources).await;

    for (source, records) in &results {
        println!("{} ({} results)", source, records.len());
        println!("{}", "-".repeat(40));
        if records.is_empty() {
            println!("No results.");
        }
        for (i, record) in records.iter().enumerate() {
            match record {
                BackendRecord::Video(v) => print_video(i + 1, v),
                BackendRecord::Book(b) => print_book(i + 1, b),
            }
        }
        println!();
    }

    Ok(())
}

/// `colh list-emby`: items from one library or from all of them.
pub async fn run_list_emby(config: &Config, library: Option<&str>, limit: usize) -> Result<()> {
    if config.emby.is_none() {
        bail!("Emby is not configured (missing [emby] section)");
    }
    let manager = MediaManager::connect(config)?;
    let items = manager.list_items(library, limit).await;

    if items.is_empty() {
        println!("No items.");
        return Ok(());
    }
    for (i, item) in items.iter().enumerate() {
        print_video(i + 1, item);
    }
    println!();
    println!("{} items", items.len());
    Ok(())
}

/// `colh list-books`.
pub async fn run_list_books(config: &Config, limit: usize) -> Result<()> {
    if config.booklore.is_none() {
        bail!("Booklore is not configured (missing [booklore] section)");
    }
    let manager = MediaManager::connect(config)?;
    let books = manager.list_books(limit).await;

    if books.is_empty() {
        println!("No books.");
        return Ok(());
    }
    for (i, book) in books.iter().enumerate() {
        print_book(i + 1, book);
    }
    println!();
    println!("{} books", books.len());
    Ok(())
}

/// `colh libraries`: Emby libraries and Booklore collections.
pub async fn run_libraries(config: &Config) -> Result<()> {
    let manager = MediaManager::connect(config)?;
    let groupings = manager.list_groupings().await;

    if groupings.is_empty() {
        println!("No backends configured.");
        return Ok(());
    }

    println!("{:<12} NAME", "SOURCE");
    for (source, names) in &groupings {
        if names.is_empty() {
            println!("{:<12} (none)", source.as_str());
        }
        for name in names {
            println!("{:<12} {}", source.as_str(), name);
        }
    }
    Ok(())
}

/// `colh stats`.
pub async fn run_stats(config: &Config) -> Result<()> {
    let manager = MediaManager::connect(config)?;
    let stats = manager.collection_stats().await;

    println!("Collection Stats");
    println!("================");
    println!();
    if manager.is_configured(Source::Emby) {
        println!("  Emby");
        println!("    Libraries:   {}", stats.emby.libraries.len());
        for name in &stats.emby.libraries {
            println!("      - {}", name);
        }
        println!("    Items:       {}", stats.emby.total_items);
        println!();
    }
    if manager.is_configured(Source::Booklore) {
        println!("  Booklore");
        println!("    Books:       {}", stats.booklore.total_books);
        println!("    Collections: {}", stats.booklore.collections.len());
        for name in &stats.booklore.collections {
            println!("      - {}", name);
        }
        println!();
    }
    Ok(())
}

/// `colh health`: one line per backend, configured or not.
pub async fn run_health(config: &Config) -> Result<()> {
    let manager = MediaManager::connect(config)?;
    let health = manager.health_all().await;

    println!("{:<12} STATUS", "SOURCE");
    for source in Source::all() {
        let status = match health.get(&source) {
            Some(true) => "ok",
            Some(false) => "unreachable",
            None => "not configured",
        };
        println!("{:<12} {}", source.as_str(), status);
    }
    Ok(())
}

/// `colh recommend`: run the daily flow and print (or dump as JSON) the set.
pub async fn run_recommend(
    config: &Config,
    count: Option<usize>,
    preferences: Option<&str>,
    json: bool,
) -> Result<()> {
    let Some(llm) = &config.llm else {
        bail!("No LLM configured (missing [llm] section)");
    };
    let count = count.unwrap_or(config.recommendations.count);
    if count == 0 {
        bail!("count must be at least 1");
    }

    let engine = RecommendationEngine::from_config(llm)?;
    let manager = MediaManager::connect(config)?;
    let set = engine
        .generate_daily(&manager, count, config.recommendations.fetch_limit, preferences)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }

    println!(
        "Recommendations ({} items considered, provider: {})",
        set.total_items_considered, set.llm_provider
    );
    println!();
    if set.recommendations.is_empty() {
        println!("No recommendations.");
    }
    for (i, rec) in set.recommendations.iter().enumerate() {
        let score = rec
            .match_score
            .map(|s| format!("[{:.2}] ", s))
            .unwrap_or_default();
        println!("{}. {}{} ({})", i + 1, score, rec.name, rec.media_type.as_str());
        println!("    {}", clip(&rec.reason, 200));
    }
    Ok(())
}
