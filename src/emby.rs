//! Emby adapter.
//!
//! Talks to the Emby REST API with the `X-Emby-Token` header.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | groupings | `GET /Library/MediaFolders` |
//! | list      | `GET /Items?ParentId=&Limit=&StartIndex=&IncludeItemTypes=Movie,Series,Book` |
//! | search    | `GET /Items?SearchTerm=&Limit=&Recursive=true` |
//! | item      | `GET /Items/{id}` |
//! | health    | `GET /System/Info` |
//!
//! List endpoints answer `{"Items": [...], "TotalRecordCount": n}`; a bare
//! array is accepted as well.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::EmbyConfig;
use crate::decode::list_items;
use crate::http::JsonClient;
use crate::models::{Grouping, Source, VideoItem};
use crate::traits::Backend;

const LIST_FIELDS: &[&str] = &["Items", "items"];
const LIST_ITEM_TYPES: &str = "Movie,Series,Book";

pub struct EmbyAdapter {
    http: JsonClient,
}

impl EmbyAdapter {
    pub fn new(config: &EmbyConfig) -> Result<Self> {
        let http = JsonClient::new(
            &config.url,
            &[("X-Emby-Token", config.api_key.clone())],
            config.timeout_secs,
        )?;
        Ok(Self { http })
    }

    /// Search restricted to the given Emby item types (`Movie`, `Series`, ...).
    pub async fn search_typed(
        &self,
        query: &str,
        item_types: &[&str],
        limit: usize,
    ) -> Vec<VideoItem> {
        let mut params = vec![
            ("SearchTerm", query.to_string()),
            ("Limit", limit.to_string()),
            ("Recursive", "true".to_string()),
        ];
        if !item_types.is_empty() {
            params.push(("IncludeItemTypes", item_types.join(",")));
        }

        match self.http.get_json(&["Items"], &params).await {
            Ok(body) => {
                let items = parse_items(body);
                tracing::info!("Found {} Emby items matching '{}'", items.len(), query);
                items
            }
            Err(e) => {
                tracing::error!("Emby search failed: {:#}", e);
                Vec::new()
            }
        }
    }
}

/// Decode a list body into video items, dropping entries that don't parse.
pub fn parse_items(body: Value) -> Vec<VideoItem> {
    list_items(body, LIST_FIELDS)
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<VideoItem>(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!("Skipping malformed Emby item: {}", e);
                None
            }
        })
        .collect()
}

fn parse_groupings(body: Value) -> Vec<Grouping> {
    list_items(body, LIST_FIELDS)
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<Grouping>(raw).ok())
        .collect()
}

#[async_trait]
impl Backend for EmbyAdapter {
    type Record = VideoItem;

    fn source(&self) -> Source {
        Source::Emby
    }

    async fn fetch_items(
        &self,
        grouping: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Vec<VideoItem> {
        let mut params = vec![
            ("Limit", limit.to_string()),
            ("StartIndex", offset.to_string()),
            ("IncludeItemTypes", LIST_ITEM_TYPES.to_string()),
        ];
        match grouping {
            Some(parent) => params.push(("ParentId", parent.to_string())),
            None => params.push(("Recursive", "true".to_string())),
        }

        match self.http.get_json(&["Items"], &params).await {
            Ok(body) => {
                let items = parse_items(body);
                tracing::info!(
                    "Retrieved {} items from Emby library {}",
                    items.len(),
                    grouping.unwrap_or("(all)")
                );
                items
            }
            Err(e) => {
                tracing::error!("Failed to retrieve Emby items: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_item(&self, id: &str) -> Option<VideoItem> {
        let no_query: &[(&str, &str)] = &[];
        let body = match self.http.get_json(&["Items", id], no_query).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to retrieve Emby item {}: {:#}", id, e);
                return None;
            }
        };
        match serde_json::from_value(body) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Emby item {} has an unexpected shape: {}", id, e);
                None
            }
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<VideoItem> {
        self.search_typed(query, &[], limit).await
    }

    async fn list_groupings(&self) -> Vec<Grouping> {
        let no_query: &[(&str, &str)] = &[];
        match self.http.get_json(&["Library", "MediaFolders"], no_query).await {
            Ok(body) => {
                let libraries = parse_groupings(body);
                tracing::info!("Retrieved {} libraries from Emby", libraries.len());
                libraries
            }
            Err(e) => {
                tracing::error!("Failed to retrieve Emby libraries: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn health(&self) -> bool {
        let no_query: &[(&str, &str)] = &[];
        match self.http.get_json(&["System", "Info"], no_query).await {
            Ok(_) => {
                tracing::info!("Emby health check passed");
                true
            }
            Err(e) => {
                tracing::error!("Emby health check failed: {:#}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_enveloped_items() {
        let items = parse_items(json!({
            "Items": [
                {"Id": "1", "Name": "Alien", "Type": "Movie", "ProductionYear": 1979},
                {"Id": "2", "Name": "Dark", "Type": "Series"}
            ],
            "TotalRecordCount": 2
        }));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Alien");
        assert_eq!(items[1].item_type, "Series");
    }

    #[test]
    fn flat_list_matches_envelope() {
        let records = json!([
            {"Id": "1", "Name": "Alien", "Type": "Movie"},
            {"Id": "2", "Name": "Dark", "Type": "Series"}
        ]);
        let flat = parse_items(records.clone());
        let enveloped = parse_items(json!({ "Items": records }));
        assert_eq!(flat, enveloped);
    }

    #[test]
    fn drops_items_without_identifier() {
        let items = parse_items(json!({
            "Items": [
                {"Name": "No id", "Type": "Movie"},
                {"Id": "", "Name": "Empty id", "Type": "Movie"},
                {"Id": "3", "Name": "Kept", "Type": "Movie"}
            ]
        }));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "3");
    }

    #[test]
    fn odd_field_values_keep_the_record() {
        let items = parse_items(json!({
            "Items": [
                {"Id": "1", "Name": "Alien", "Type": "Movie", "Genres": null},
                {"Id": "2", "Name": "Heat", "Type": "Movie", "ProductionYear": "1995"},
                {"Id": "3", "Type": "Movie", "CommunityRating": "7.9", "RunTimeTicks": "100"},
                {"Id": "4", "Name": null, "Type": null, "Overview": 12, "ProductionYear": "soon"}
            ]
        }));
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);

        assert!(items[0].genres.is_empty());
        assert_eq!(items[1].production_year, Some(1995));
        assert_eq!(items[2].name, "");
        assert_eq!(items[2].community_rating, Some(7.9));
        assert_eq!(items[2].run_time_ticks, Some(100));
        assert_eq!(items[3].item_type, "");
        assert_eq!(items[3].overview.as_deref(), Some("12"));
        assert_eq!(items[3].production_year, None);
    }

    #[test]
    fn parses_libraries() {
        let libs = parse_groupings(json!({
            "Items": [
                {"Id": "a", "Name": "Movies", "CollectionType": "movies"},
                {"Id": "b", "Name": "Shows", "CollectionType": "tvshows"}
            ]
        }));
        let names: Vec<_> = libs.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Movies", "Shows"]);
    }

    #[tokio::test]
    async fn unreachable_server_degrades() {
        let adapter = EmbyAdapter::new(&EmbyConfig {
            url: "http://127.0.0.1:1".to_string(),
            api_key: "k".to_string(),
            timeout_secs: 2,
        })
        .unwrap();

        assert!(adapter.fetch_items(None, 10, 0).await.is_empty());
        assert!(adapter.search("alien", 10).await.is_empty());
        assert!(adapter.fetch_item("1").await.is_none());
        assert!(adapter.list_groupings().await.is_empty());
        assert!(!adapter.health().await);
    }
}
