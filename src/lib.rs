//! # Collection Helper
//!
//! One view over a personal media collection kept in two places: videos on
//! an Emby server and books on a Booklore server. Both are searched, listed
//! and summarized through a single aggregation layer, and a language model
//! turns the combined collection into acquisition suggestions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐
//! │  Emby    │   │ Booklore │
//! │ adapter  │   │ adapter  │
//! └────┬─────┘   └────┬─────┘
//!      └──────┬───────┘
//!             ▼
//!      ┌──────────────┐      ┌───────────┐      ┌──────────────┐
//!      │ MediaManager │─────▶│  unify    │─────▶│ Recommend.   │──▶ LLM
//!      └──────┬───────┘      └───────────┘      │   Engine     │
//!             │                                 └──────────────┘
//!      ┌──────┴───────┐
//!      ▼              ▼
//! ┌──────────┐  ┌──────────┐
//! │   CLI    │  │   HTTP   │
//! │  (colh)  │  │  (axum)  │
//! └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! colh health                     # are both backends reachable?
//! colh search -q "dune"           # search videos and books
//! colh stats                      # library and collection counts
//! colh recommend --count 3        # ask the LLM what to get next
//! colh serve                      # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | tracing subscriber setup |
//! | [`models`] | Core data types |
//! | [`decode`] | Lenient JSON decoding helpers |
//! | [`http`] | Shared JSON-over-HTTP client |
//! | [`traits`] | Backend and LLM transport traits |
//! | [`emby`] | Emby adapter |
//! | [`booklore`] | Booklore adapter |
//! | [`manager`] | Cross-backend aggregation |
//! | [`unify`] | Projection onto a common item shape |
//! | [`llm`] | LLM provider transports |
//! | [`recommend`] | Recommendation engine |
//! | [`commands`] | CLI command runners |
//! | [`server`] | HTTP API |

pub mod booklore;
pub mod commands;
pub mod config;
pub mod decode;
pub mod emby;
pub mod http;
pub mod llm;
pub mod logging;
pub mod manager;
pub mod models;
pub mod recommend;
pub mod server;
pub mod traits;
pub mod unify;
