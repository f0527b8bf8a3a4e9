//! Projection of backend records onto [`UnifiedItem`].
//!
//! Pure mapping, no I/O. Identifiers are prefixed with the source tag so
//! items from both backends can share one namespace.

use crate::models::{Book, Source, UnifiedItem, VideoItem};

pub trait Unify {
    fn unify(&self) -> UnifiedItem;
}

impl Unify for VideoItem {
    fn unify(&self) -> UnifiedItem {
        let kind = self
            .media_type
            .clone()
            .or_else(|| (!self.item_type.is_empty()).then(|| self.item_type.to_lowercase()));

        UnifiedItem {
            id: unified_id(Source::Emby, &self.id),
            name: self.name.clone(),
            source: Source::Emby,
            media_type: kind,
            authors: Vec::new(),
            year: self.production_year,
            genres: self.genres.clone(),
            description: self.overview.clone(),
        }
    }
}

impl Unify for Book {
    fn unify(&self) -> UnifiedItem {
        UnifiedItem {
            id: unified_id(Source::Booklore, &self.id),
            name: self.title.clone(),
            source: Source::Booklore,
            media_type: Some("book".to_string()),
            authors: self.authors.clone(),
            // Booklore exposes only a free-form publish date, not a year.
            year: None,
            genres: self.categories.clone(),
            description: self.description.clone(),
        }
    }
}

pub fn unified_id(source: Source, id: &str) -> String {
    format!("{}_{}", source.as_str(), id)
}

/// Unify a whole batch, videos first.
pub fn unify_all(videos: &[VideoItem], books: &[Book]) -> Vec<UnifiedItem> {
    videos
        .iter()
        .map(Unify::unify)
        .chain(books.iter().map(Unify::unify))
        .collect()
}
