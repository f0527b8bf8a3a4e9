//! Minimal JSON-over-HTTP client shared by the backend adapters.
//!
//! Credentials and the `Accept` header are attached once, as default
//! headers, when the client is built. Every call is otherwise stateless.
//! Paths are given as segments and percent-encoded one by one, so an id
//! containing `/` or `?` stays inside its segment.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub struct JsonClient {
    client: reqwest::Client,
    base_url: String,
}

impl JsonClient {
    /// Build a client for `base_url` carrying `headers` on every request.
    pub fn new(base_url: &str, headers: &[(&str, String)], timeout_secs: u64) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {}", name))?;
            let mut value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}", name))?;
            value.set_sensitive(true);
            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL with `segments` appended, each encoded as one path segment.
    pub fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET` the path built from `segments` and decode the body as JSON.
    /// Non-2xx is an error.
    pub async fn get_json<Q>(&self, segments: &[&str], query: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url_for(segments)?;
        tracing::debug!(url = %url, "GET");

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{} returned {}: {}", url, status, truncate(&body, 200));
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let c = JsonClient::new("http://localhost:8096/", &[], 5).unwrap();
        assert_eq!(c.base_url(), "http://localhost:8096");
    }

    #[test]
    fn url_for_encodes_each_segment() {
        let c = JsonClient::new("http://localhost:8096/", &[], 5).unwrap();
        let url = c.url_for(&["Items", "a/b?c d"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8096/Items/a%2Fb%3Fc%20d");
    }

    #[test]
    fn url_for_keeps_base_path() {
        let c = JsonClient::new("http://nas.local/booklore", &[], 5).unwrap();
        let url = c.url_for(&["api", "books", "12"]).unwrap();
        assert_eq!(url.as_str(), "http://nas.local/booklore/api/books/12");
    }

    #[test]
    fn rejects_bad_header_name() {
        assert!(JsonClient::new("http://x", &[("bad header", "v".into())], 5).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ab", 10), "ab");
    }
}
