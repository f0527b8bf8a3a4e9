//! Extension seams: backend adapters and LLM transports.
//!
//! [`Backend`] is implemented by [`EmbyAdapter`](crate::emby::EmbyAdapter)
//! and [`BookloreAdapter`](crate::booklore::BookloreAdapter); the
//! [`MediaManager`](crate::manager::MediaManager) only talks to adapters
//! through it, so tests and custom binaries can plug in their own.
//!
//! [`CompletionTransport`] is the single call the recommendation engine makes
//! to a language model.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Grouping, Source};

/// A per-backend adapter.
///
/// Every operation is total: network failures, non-2xx answers and malformed
/// bodies are logged inside the adapter and surface as an empty list,
/// `None`, or `false`. Nothing propagates, so one unreachable backend can
/// never abort an aggregated operation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Normalized record type this backend produces.
    type Record: Send + Sync;

    /// Key this backend's results are reported under.
    fn source(&self) -> Source;

    /// List records, optionally restricted to one grouping id.
    async fn fetch_items(
        &self,
        grouping: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Vec<Self::Record>;

    async fn fetch_item(&self, id: &str) -> Option<Self::Record>;

    async fn search(&self, query: &str, limit: usize) -> Vec<Self::Record>;

    async fn list_groupings(&self) -> Vec<Grouping>;

    async fn health(&self) -> bool;
}

/// One prompt in, one raw text reply out.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Provider label reported alongside results (e.g. `"openai"`).
    fn provider_name(&self) -> &str;

    /// Send `prompt` and return the model's text. Transport and HTTP
    /// failures are errors.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
