//! # Collection Helper CLI (`colh`)
//!
//! The `colh` binary searches, lists and summarizes a personal media
//! collection spread over an Emby video server and a Booklore book server,
//! asks a language model for acquisition suggestions, and can serve all of
//! that as a JSON API.
//!
//! ## Usage
//!
//! ```bash
//! colh --config ./config/colh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `colh search -q "<query>"` | Search Emby and Booklore |
//! | `colh list-emby` | List Emby items, optionally from one library |
//! | `colh list-books` | List Booklore books |
//! | `colh libraries` | List Emby libraries and Booklore collections |
//! | `colh stats` | Collection statistics |
//! | `colh health` | Check backend reachability |
//! | `colh recommend` | Generate acquisition suggestions |
//! | `colh serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Books only
//! colh search -q "le guin" --no-emby
//!
//! # Twenty items from the "Movies" library
//! colh list-emby --library Movies --limit 20
//!
//! # Three suggestions per category, as JSON
//! colh recommend --count 3 --preferences "More non-fiction" --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use collection_helper::models::Source;
use collection_helper::{commands, config, logging, server};

/// Collection Helper CLI: one view over an Emby library and a Booklore
/// library, with LLM-backed acquisition suggestions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/colh.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "colh",
    about = "Collection Helper: search and get recommendations across Emby and Booklore",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/colh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search across both backends.
    Search {
        /// The search query string.
        #[arg(short, long)]
        query: String,

        /// Skip Emby.
        #[arg(long)]
        no_emby: bool,

        /// Skip Booklore.
        #[arg(long)]
        no_booklore: bool,
    },

    /// List Emby items.
    ListEmby {
        /// Only items from the library with this name.
        #[arg(long)]
        library: Option<String>,

        /// Maximum number of items per library.
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// List Booklore books.
    ListBooks {
        /// Maximum number of books.
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// List Emby libraries and Booklore collections.
    Libraries,

    /// Show collection statistics.
    Stats,

    /// Check whether each backend is reachable.
    Health,

    /// Generate acquisition recommendations.
    ///
    /// Fetches both collections, then asks the configured language model for
    /// suggestions per category, plus one off-pattern "surprise" pick each.
    Recommend {
        /// Suggestions per category (defaults to `[recommendations].count`).
        #[arg(long)]
        count: Option<usize>,

        /// Free-text preferences passed to the model.
        #[arg(long)]
        preferences: Option<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    let _log_guard = logging::init(&cfg.logging)?;

    match cli.command {
        Commands::Search {
            query,
            no_emby,
            no_booklore,
        } => {
            let sources: Vec<Source> = Source::all()
                .into_iter()
                .filter(|s| match s {
                    Source::Emby => !no_emby,
                    Source::Booklore => !no_booklore,
                })
                .collect();
            commands::run_search(&cfg, &query, &sources).await?;
        }
        Commands::ListEmby { library, limit } => {
            commands::run_list_emby(&cfg, library.as_deref(), limit).await?;
        }
        Commands::ListBooks { limit } => {
            commands::run_list_books(&cfg, limit).await?;
        }
        Commands::Libraries => {
            commands::run_libraries(&cfg).await?;
        }
        Commands::Stats => {
            commands::run_stats(&cfg).await?;
        }
        Commands::Health => {
            commands::run_health(&cfg).await?;
        }
        Commands::Recommend {
            count,
            preferences,
            json,
        } => {
            commands::run_recommend(&cfg, count, preferences.as_deref(), json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
