//! Acquisition recommendations.
//!
//! The engine splits the unified collection into books and videos, asks the
//! model once per non-empty side for `count` pattern-based suggestions plus
//! one "surprise" pick, and parses each free-text reply back into
//! [`RecommendationItem`]s.
//!
//! Reply parsing is deliberately forgiving about surrounding prose: the text
//! between the first `{` and the last `}` is parsed as JSON. A reply that
//! doesn't parse costs only its own category.

use anyhow::Result;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::llm::LlmClient;
use crate::manager::MediaManager;
use crate::models::{MediaKind, RecommendationItem, RecommendationSet, Source, UnifiedItem};
use crate::traits::CompletionTransport;
use crate::unify::unify_all;

/// Items listed in a prompt per category.
pub const PROMPT_SAMPLE: usize = 30;
/// Genres shown per listed item.
const GENRES_PER_ITEM: usize = 3;

const BOOK_KEYWORDS: &[&str] = &["book", "novel", "author", "read", "reading"];

/// What a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Book,
    Video,
    /// Both sides in one prompt; kinds are then guessed from the reason text.
    Mixed,
}

impl Category {
    fn collection_label(&self) -> &'static str {
        match self {
            Category::Book => "Books",
            Category::Video => "Movies & TV Shows",
            Category::Mixed => "Media Collection",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Category::Book => "books",
            Category::Video => "movies and TV shows",
            Category::Mixed => "items",
        }
    }

    fn kind(&self) -> Option<MediaKind> {
        match self {
            Category::Book => Some(MediaKind::Book),
            Category::Video => Some(MediaKind::Video),
            Category::Mixed => None,
        }
    }
}

/// Options for one prompt.
#[derive(Debug, Clone)]
pub struct PromptRequest<'a> {
    pub category: Category,
    pub count: usize,
    pub include_surprise: bool,
    pub user_preferences: Option<&'a str>,
}

fn book_line(item: &UnifiedItem) -> String {
    let mut line = format!("- {}", item.name);
    if !item.authors.is_empty() {
        line.push_str(&format!(" by {}", item.authors.join(", ")));
    }
    push_genres(&mut line, &item.genres);
    line
}

fn video_line(item: &UnifiedItem) -> String {
    let mut line = format!("- {}", item.name);
    if let Some(kind) = &item.media_type {
        line.push_str(&format!(" ({})", kind));
    }
    push_genres(&mut line, &item.genres);
    line
}

fn push_genres(line: &mut String, genres: &[String]) {
    if !genres.is_empty() {
        let shown: Vec<&str> = genres.iter().take(GENRES_PER_ITEM).map(String::as_str).collect();
        line.push_str(&format!(" - {}", shown.join(", ")));
    }
}

fn sample_lines(items: &[&UnifiedItem], line: fn(&UnifiedItem) -> String) -> String {
    items
        .iter()
        .take(PROMPT_SAMPLE)
        .map(|i| line(i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the prompt for `items` under `req`.
pub fn build_prompt(items: &[&UnifiedItem], req: &PromptRequest<'_>) -> String {
    let listing = match req.category {
        Category::Book => sample_lines(items, book_line),
        Category::Video => sample_lines(items, video_line),
        Category::Mixed => {
            let videos: Vec<&UnifiedItem> =
                items.iter().copied().filter(|i| i.source == Source::Emby).collect();
            let books: Vec<&UnifiedItem> =
                items.iter().copied().filter(|i| i.source == Source::Booklore).collect();
            let mut sections = Vec::new();
            if !videos.is_empty() {
                sections.push(format!(
                    "Current Movies & TV Shows:\n{}",
                    sample_lines(&videos, video_line)
                ));
            }
            if !books.is_empty() {
                sections.push(format!("Current Books:\n{}", sample_lines(&books, book_line)));
            }
            sections.join("\n\n")
        }
    };

    let label = req.category.collection_label();
    let noun = req.category.noun();

    let mut prompt = format!(
        "You are a media recommendation expert. Analyze the user's current {label} below and \
         suggest NEW {noun} they might enjoy acquiring.\n\n\
         Their Current {label}:\n{listing}\n\n\
         Based on their collection's themes, genres, and authors, suggest exactly {count} NEW \
         {noun} they DON'T have but would likely enjoy.\n",
        count = req.count,
    );

    if req.include_surprise {
        prompt.push_str(
            "Then, suggest exactly 1 ADDITIONAL recommendation that is DIFFERENT from their usual \
             patterns - something that would diversify their collection and expose them to a new \
             genre, style, or perspective they haven't explored much.\n",
        );
    }

    prompt.push_str(
        "IMPORTANT:\n\
         - Suggest items NOT listed above (new discoveries for them)\n\
         - Consider patterns in their collection (genres, authors, themes)\n\
         - Be specific with titles - these should be real, well-known works\n",
    );

    if let Some(prefs) = req.user_preferences.filter(|p| !p.trim().is_empty()) {
        prompt.push_str(&format!("Additional Context:\n{}\n", prefs.trim()));
    }

    prompt.push_str(&format!(
        "Provide recommendations in this JSON format:\n\
         {{\n  \"recommendations\": [\n    {{\n      \"name\": \"Title of the {noun}\",\n      \
         \"reason\": \"Why they would like this based on their collection patterns (1-2 sentences)\",\n      \
         \"match_score\": 0.85\n    }}\n  ]\n}}\n\n"
    ));

    if req.include_surprise {
        prompt.push_str(
            "The LAST recommendation should be the SURPRISE recommendation that diversifies their \
             collection.\n\n",
        );
    }

    prompt.push_str("Respond ONLY with valid JSON.");
    prompt
}

/// Slice from the first `{` to the last `}` inclusive.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decide a suggestion's kind: the prompt category when known, otherwise
/// keyword matching on the reason, defaulting to video.
pub fn classify(category: Category, reason: &str) -> MediaKind {
    if let Some(kind) = category.kind() {
        return kind;
    }
    let reason = reason.to_lowercase();
    if BOOK_KEYWORDS.iter().any(|k| reason.contains(k)) {
        MediaKind::Book
    } else {
        MediaKind::Video
    }
}

fn non_empty_str<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_entry(entry: &Value, category: Category) -> Option<RecommendationItem> {
    let Some(name) = non_empty_str(entry, "name") else {
        tracing::warn!("Dropping recommendation without a name: {}", entry);
        return None;
    };
    let Some(reason) = non_empty_str(entry, "reason") else {
        tracing::warn!("Dropping recommendation '{}' without a reason", name);
        return None;
    };

    let match_score = match entry.get("match_score") {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_f64() {
            Some(score) if (0.0..=1.0).contains(&score) => Some(score),
            _ => {
                tracing::warn!("Dropping recommendation '{}' with invalid match_score {}", name, v);
                return None;
            }
        },
    };

    let kind = classify(category, reason);
    Some(RecommendationItem {
        name: name.to_string(),
        source: kind.suggestion_source().to_string(),
        media_type: kind,
        reason: reason.to_string(),
        match_score,
    })
}

/// Parse a raw model reply. Never fails: unusable replies give an empty list.
pub fn parse_response(text: &str, category: Category) -> Vec<RecommendationItem> {
    let Some(span) = json_span(text) else {
        tracing::warn!("No JSON found in LLM response");
        return Vec::new();
    };

    let data: Value = match serde_json::from_str(span) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to parse LLM response as JSON: {}", e);
            tracing::debug!("LLM response was: {}", text);
            return Vec::new();
        }
    };

    let Some(entries) = data.get("recommendations").and_then(Value::as_array) else {
        tracing::warn!("LLM response has no recommendations array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|e| parse_entry(e, category))
        .collect()
}

pub struct RecommendationEngine {
    transport: Box<dyn CompletionTransport>,
}

impl RecommendationEngine {
    pub fn new(transport: Box<dyn CompletionTransport>) -> Self {
        Self { transport }
    }

    /// Engine backed by the HTTP client for the configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(Box::new(LlmClient::new(config)?)))
    }

    pub fn provider_name(&self) -> &str {
        self.transport.provider_name()
    }

    /// One prompt over the whole collection. Kinds come from the reason text.
    pub async fn generate_mixed(
        &self,
        items: &[UnifiedItem],
        count: usize,
        user_preferences: Option<&str>,
    ) -> Result<RecommendationSet> {
        let all: Vec<&UnifiedItem> = items.iter().collect();
        let prompt = build_prompt(
            &all,
            &PromptRequest {
                category: Category::Mixed,
                count,
                include_surprise: false,
                user_preferences,
            },
        );
        let reply = self.transport.complete(&prompt).await?;
        Ok(self.finish(parse_response(&reply, Category::Mixed), items.len()))
    }

    fn finish(&self, recommendations: Vec<RecommendationItem>, considered: usize) -> RecommendationSet {
        RecommendationSet {
            date: chrono::Local::now().to_rfc3339(),
            recommendations,
            total_items_considered: considered,
            llm_provider: self.transport.provider_name().to_string(),
        }
    }

    /// Generate `count` + 1 suggestions per non-empty side of `items`,
    /// books first.
    ///
    /// A transport failure drops only that side. If every side that was
    /// attempted failed at the transport, the last failure is returned.
    pub async fn generate(
        &self,
        items: &[UnifiedItem],
        count: usize,
        user_preferences: Option<&str>,
    ) -> Result<RecommendationSet> {
        let books: Vec<&UnifiedItem> = items.iter().filter(|i| i.source == Source::Booklore).collect();
        let videos: Vec<&UnifiedItem> = items.iter().filter(|i| i.source == Source::Emby).collect();
        tracing::info!("Found {} books and {} videos", books.len(), videos.len());

        let mut recommendations = Vec::new();
        let mut attempted = 0;
        let mut failed = 0;
        let mut last_error = None;

        for (category, subset) in [(Category::Book, &books), (Category::Video, &videos)] {
            if subset.is_empty() {
                continue;
            }
            attempted += 1;
            tracing::info!("Generating {:?} recommendations", category);

            let prompt = build_prompt(
                subset,
                &PromptRequest {
                    category,
                    count,
                    include_surprise: true,
                    user_preferences,
                },
            );

            match self.transport.complete(&prompt).await {
                Ok(reply) => {
                    let parsed = parse_response(&reply, category);
                    tracing::info!("Generated {} {:?} recommendations", parsed.len(), category);
                    recommendations.extend(parsed);
                }
                Err(e) => {
                    tracing::error!("LLM request for {:?} recommendations failed: {:#}", category, e);
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed > 0 && failed == attempted {
            if let Some(e) = last_error {
                return Err(e.context("All recommendation requests failed"));
            }
        }

        Ok(self.finish(recommendations, items.len()))
    }

    /// Fetch both collections through `manager`, unify, and generate.
    pub async fn generate_daily(
        &self,
        manager: &MediaManager,
        count: usize,
        fetch_limit: usize,
        user_preferences: Option<&str>,
    ) -> Result<RecommendationSet> {
        tracing::info!("Generating daily recommendations");
        let videos = manager.list_items(None, fetch_limit).await;
        let books = manager.list_books(fetch_limit).await;
        let items = unify_all(&videos, &books);
        tracing::info!("Fetched and cleaned {} items", items.len());
        self.generate(&items, count, user_preferences).await
    }
}
