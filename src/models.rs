//! Core data types.
//!
//! Backend records ([`VideoItem`], [`Book`]) are what the adapters produce;
//! [`UnifiedItem`] is the source-agnostic projection used for recommendations;
//! [`RecommendationItem`] / [`RecommendationSet`] are what the engine returns.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decode::{
    de_id, de_names, de_opt_f64, de_opt_i32, de_opt_i64, de_opt_string, de_string_or_default,
};

/// Which backend a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Emby,
    Booklore,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Emby => "emby",
            Source::Booklore => "booklore",
        }
    }

    pub fn all() -> [Source; 2] {
        [Source::Emby, Source::Booklore]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One media title from Emby.
///
/// Emby answers in PascalCase; the aliases let the same struct accept the
/// snake_case shape it serializes to. Only the id is required: every other
/// field decodes leniently and falls back to its default, so one odd value
/// never costs the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    #[serde(alias = "Id", deserialize_with = "de_id")]
    pub id: String,
    #[serde(alias = "Name", default, deserialize_with = "de_string_or_default")]
    pub name: String,
    #[serde(rename = "type", alias = "Type", default, deserialize_with = "de_string_or_default")]
    pub item_type: String,
    #[serde(alias = "MediaType", default, deserialize_with = "de_opt_string")]
    pub media_type: Option<String>,
    #[serde(alias = "PremiereDate", default, deserialize_with = "de_opt_string")]
    pub premiere_date: Option<String>,
    #[serde(alias = "ProductionYear", default, deserialize_with = "de_opt_i32")]
    pub production_year: Option<i32>,
    #[serde(alias = "CommunityRating", default, deserialize_with = "de_opt_f64")]
    pub community_rating: Option<f64>,
    #[serde(alias = "RunTimeTicks", default, deserialize_with = "de_opt_i64")]
    pub run_time_ticks: Option<i64>,
    #[serde(alias = "Genres", default, deserialize_with = "de_names")]
    pub genres: Vec<String>,
    #[serde(alias = "Studios", default, deserialize_with = "de_names")]
    pub studios: Vec<String>,
    #[serde(alias = "Overview", default, deserialize_with = "de_opt_string")]
    pub overview: Option<String>,
    #[serde(alias = "Path", default, deserialize_with = "de_opt_string")]
    pub path: Option<String>,
}

/// One book from Booklore.
///
/// Built by [`crate::booklore::parse_book`], which probes the nested
/// `metadata` object for anything missing at top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub publish_date: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub page_count: Option<u32>,
    pub rating: Option<f64>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub series_name: Option<String>,
    pub cover_url: Option<String>,
    pub file_path: Option<String>,
}

impl Book {
    /// Authors joined for display, `None` when the list is empty.
    pub fn author_line(&self) -> Option<String> {
        if self.authors.is_empty() {
            None
        } else {
            Some(self.authors.join(", "))
        }
    }
}

/// A named grouping within a backend: an Emby library, a Booklore
/// collection or series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grouping {
    #[serde(alias = "Id", deserialize_with = "de_id")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(
        alias = "ChildCount",
        alias = "bookCount",
        alias = "book_count",
        alias = "itemCount",
        default
    )]
    pub item_count: Option<u64>,
    #[serde(alias = "CollectionType", alias = "collection_type", default)]
    pub kind: Option<String>,
    #[serde(alias = "Description", default)]
    pub description: Option<String>,
}

/// A record from either backend, as returned by cross-source operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BackendRecord {
    Video(VideoItem),
    Book(Book),
}

/// Source-agnostic projection of a backend record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedItem {
    /// `"<source>_<original id>"`, unique across backends.
    pub id: String,
    pub name: String,
    pub source: Source,
    pub media_type: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub description: Option<String>,
}

/// Media kind assigned to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Book,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Book => "book",
            MediaKind::Video => "video",
        }
    }

    /// Tag used in the `source` field of a suggestion.
    pub fn suggestion_source(&self) -> &'static str {
        match self {
            MediaKind::Book => "suggested_book",
            MediaKind::Video => "suggested_video",
        }
    }
}

/// One acquisition suggested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub name: String,
    pub source: String,
    pub media_type: MediaKind,
    pub reason: String,
    pub match_score: Option<f64>,
}

/// Result of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    /// ISO-8601 timestamp of generation.
    pub date: String,
    pub recommendations: Vec<RecommendationItem>,
    pub total_items_considered: usize,
    pub llm_provider: String,
}

/// Per-backend counts for `colh stats` and `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStats {
    pub emby: EmbyStats,
    pub booklore: BookloreStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbyStats {
    pub libraries: Vec<String>,
    pub total_items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookloreStats {
    pub total_books: usize,
    pub collections: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn video_item_accepts_emby_casing() {
        let item: VideoItem = serde_json::from_value(json!({
            "Id": "123",
            "Name": "Test Movie",
            "Type": "Movie",
            "MediaType": "Video",
            "ProductionYear": 2020,
            "CommunityRating": 8.5,
            "Genres": ["Drama"],
            "Studios": [{"Name": "A24", "Id": 9}]
        }))
        .unwrap();

        assert_eq!(item.id, "123");
        assert_eq!(item.name, "Test Movie");
        assert_eq!(item.item_type, "Movie");
        assert_eq!(item.production_year, Some(2020));
        assert_eq!(item.community_rating, Some(8.5));
        assert_eq!(item.genres, vec!["Drama"]);
        assert_eq!(item.studios, vec!["A24"]);
    }

    #[test]
    fn video_item_accepts_snake_case() {
        let item: VideoItem = serde_json::from_value(json!({
            "id": "7",
            "name": "Show",
            "type": "Series",
            "production_year": 1999
        }))
        .unwrap();
        assert_eq!(item.item_type, "Series");
        assert_eq!(item.production_year, Some(1999));
        assert!(item.genres.is_empty());
    }

    #[test]
    fn grouping_accepts_numeric_ids_and_counts() {
        let lib: Grouping = serde_json::from_value(json!({
            "Id": "456",
            "Name": "Movies",
            "CollectionType": "movies"
        }))
        .unwrap();
        assert_eq!(lib.id, "456");
        assert_eq!(lib.kind.as_deref(), Some("movies"));

        let col: Grouping = serde_json::from_value(json!({
            "id": 3,
            "name": "Favourites",
            "bookCount": 12
        }))
        .unwrap();
        assert_eq!(col.id, "3");
        assert_eq!(col.item_count, Some(12));
    }

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Source::Emby).unwrap(), json!("emby"));
        assert_eq!(Source::Booklore.to_string(), "booklore");
    }
}
