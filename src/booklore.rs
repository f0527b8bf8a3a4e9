//! Booklore adapter.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | groupings | `GET /api/collections` |
//! | series    | `GET /api/series` |
//! | list      | `GET /api/books?limit=&offset=[&collectionId=]` |
//! | search    | `GET /api/books/search?q=&limit=` |
//! | item      | `GET /api/books/{id}` |
//! | health    | `GET /api/health` |
//!
//! Books arrive either as a flat array or inside a page envelope
//! (`content`, `books`, or `items`). Descriptive fields may sit at top level
//! or inside the book's `metadata` object; [`parse_book`] resolves each one
//! through [`BOOK_FIELDS`].

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::BookloreConfig;
use crate::decode::{as_f64, as_string, as_string_list, as_u32, list_items, resolve, FieldSpec};
use crate::http::JsonClient;
use crate::models::{Book, Grouping, Source};
use crate::traits::Backend;

const BOOK_LIST_FIELDS: &[&str] = &["content", "books", "items"];
const COLLECTION_FIELDS: &[&str] = &["collections", "content", "items"];
const SERIES_FIELDS: &[&str] = &["series", "content", "items"];

const METADATA: &str = "metadata";

/// Logical book field → names probed at top level, then inside `metadata`.
pub struct BookFields {
    pub title: FieldSpec,
    pub authors: FieldSpec,
    pub publisher: FieldSpec,
    pub publish_date: FieldSpec,
    pub language: FieldSpec,
    pub description: FieldSpec,
    pub isbn: FieldSpec,
    pub page_count: FieldSpec,
    pub rating: FieldSpec,
    pub categories: FieldSpec,
    pub tags: FieldSpec,
    pub series_name: FieldSpec,
    pub cover_url: FieldSpec,
    pub file_path: FieldSpec,
}

pub const BOOK_FIELDS: BookFields = BookFields {
    title: FieldSpec {
        top: &["title"],
        metadata: &["title"],
    },
    authors: FieldSpec {
        top: &["authors", "author"],
        metadata: &["authors", "author"],
    },
    publisher: FieldSpec {
        top: &["publisher"],
        metadata: &["publisher"],
    },
    publish_date: FieldSpec {
        top: &["publish_date", "publishedDate"],
        metadata: &["publishedDate", "publishDate"],
    },
    language: FieldSpec {
        top: &["language"],
        metadata: &["language"],
    },
    description: FieldSpec {
        top: &["description"],
        metadata: &["description"],
    },
    isbn: FieldSpec {
        top: &["isbn"],
        metadata: &["isbn13", "isbn10", "isbn"],
    },
    page_count: FieldSpec {
        top: &["pageCount", "page_count"],
        metadata: &["pageCount"],
    },
    rating: FieldSpec {
        top: &["rating"],
        metadata: &["rating", "goodreadsRating", "amazonRating"],
    },
    categories: FieldSpec {
        top: &["categories", "genres"],
        metadata: &["categories", "genres"],
    },
    tags: FieldSpec {
        top: &["tags"],
        metadata: &["tags"],
    },
    series_name: FieldSpec {
        top: &["seriesName", "series_name"],
        metadata: &["seriesName"],
    },
    cover_url: FieldSpec {
        top: &["coverUrl", "cover_url"],
        metadata: &["coverUrl", "thumbnailUrl"],
    },
    file_path: FieldSpec {
        top: &["filePath", "file_path"],
        metadata: &["filePath"],
    },
};

/// Build a [`Book`] from one raw record. `None` when the record has no
/// usable identifier or is not an object.
pub fn parse_book(raw: &Value) -> Option<Book> {
    let obj = raw.as_object()?;
    let id = obj.get("id").and_then(as_string)?;

    let f = &BOOK_FIELDS;
    let string = |spec: &FieldSpec| field(obj, spec).and_then(as_string);
    let list = |spec: &FieldSpec| field(obj, spec).map(as_string_list).unwrap_or_default();

    Some(Book {
        title: string(&f.title).unwrap_or_else(|| format!("Untitled ({})", id)),
        authors: list(&f.authors),
        publisher: string(&f.publisher),
        publish_date: string(&f.publish_date),
        language: string(&f.language),
        description: string(&f.description),
        isbn: string(&f.isbn),
        page_count: field(obj, &f.page_count).and_then(as_u32),
        rating: field(obj, &f.rating).and_then(as_f64),
        categories: list(&f.categories),
        tags: list(&f.tags),
        series_name: string(&f.series_name),
        cover_url: string(&f.cover_url),
        file_path: string(&f.file_path),
        id,
    })
}

fn field<'a>(obj: &'a Map<String, Value>, spec: &FieldSpec) -> Option<&'a Value> {
    resolve(obj, METADATA, spec)
}

/// Decode a list body into books, dropping records without an id.
pub fn parse_books(body: Value) -> Vec<Book> {
    list_items(body, BOOK_LIST_FIELDS)
        .iter()
        .filter_map(|raw| {
            let book = parse_book(raw);
            if book.is_none() {
                tracing::debug!("Skipping Booklore record without id");
            }
            book
        })
        .collect()
}

fn parse_groupings(body: Value, fields: &[&str]) -> Vec<Grouping> {
    list_items(body, fields)
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<Grouping>(raw).ok())
        .collect()
}

pub struct BookloreAdapter {
    http: JsonClient,
}

impl BookloreAdapter {
    pub fn new(config: &BookloreConfig) -> Result<Self> {
        let headers: Vec<(&str, String)> = match &config.api_key {
            Some(key) if !key.is_empty() => vec![("Authorization", format!("Bearer {}", key))],
            _ => Vec::new(),
        };
        let http = JsonClient::new(&config.url, &headers, config.timeout_secs)?;
        Ok(Self { http })
    }

    /// Book series known to the library.
    pub async fn list_series(&self) -> Vec<Grouping> {
        let no_query: &[(&str, &str)] = &[];
        match self.http.get_json(&["api", "series"], no_query).await {
            Ok(body) => {
                let series = parse_groupings(body, SERIES_FIELDS);
                tracing::info!("Retrieved {} series from Booklore", series.len());
                series
            }
            Err(e) => {
                tracing::error!("Failed to retrieve Booklore series: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Backend for BookloreAdapter {
    type Record = Book;

    fn source(&self) -> Source {
        Source::Booklore
    }

    async fn fetch_items(&self, grouping: Option<&str>, limit: usize, offset: usize) -> Vec<Book> {
        let mut params = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(collection) = grouping {
            params.push(("collectionId", collection.to_string()));
        }

        match self.http.get_json(&["api", "books"], &params).await {
            Ok(body) => {
                let books = parse_books(body);
                tracing::info!("Retrieved {} books from Booklore", books.len());
                books
            }
            Err(e) => {
                tracing::error!("Failed to retrieve Booklore books: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_item(&self, id: &str) -> Option<Book> {
        let no_query: &[(&str, &str)] = &[];
        match self.http.get_json(&["api", "books", id], no_query).await {
            Ok(body) => parse_book(&body),
            Err(e) => {
                tracing::error!("Failed to retrieve Booklore book {}: {:#}", id, e);
                None
            }
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<Book> {
        let params = [("q", query.to_string()), ("limit", limit.to_string())];
        match self.http.get_json(&["api", "books", "search"], &params).await {
            Ok(body) => {
                let books = parse_books(body);
                tracing::info!("Found {} books matching '{}'", books.len(), query);
                books
            }
            Err(e) => {
                tracing::error!("Booklore search failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn list_groupings(&self) -> Vec<Grouping> {
        let no_query: &[(&str, &str)] = &[];
        match self.http.get_json(&["api", "collections"], no_query).await {
            Ok(body) => {
                let collections = parse_groupings(body, COLLECTION_FIELDS);
                tracing::info!("Retrieved {} collections from Booklore", collections.len());
                collections
            }
            Err(e) => {
                tracing::error!("Failed to retrieve Booklore collections: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn health(&self) -> bool {
        let no_query: &[(&str, &str)] = &[];
        match self.http.get_json(&["api", "health"], no_query).await {
            Ok(_) => {
                tracing::info!("Booklore health check passed");
                true
            }
            Err(e) => {
                tracing::error!("Booklore health check failed: {:#}", e);
                false
            }
        }
    }
}
