use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{MovieSource, SampleDocument, SourceKind};
use crate::error::CatalogError;
use crate::models::{Movie, MoviePage};
use crate::normalize::{normalize, SourceRecord, TmdbMovieRecord};

/// Reaches the catalog through an edge proxy instead of contacting sources directly.
#[derive(Debug, Clone)]
pub struct ProxiedSource {
    client: Client,
    base: String,
}

impl ProxiedSource {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path_and_query: &str,
    ) -> Result<T, CatalogError> {
        let url = format!("{}/api{}", self.base, path_and_query);
        debug!("Proxy request {}", url);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::upstream(format!("proxy request failed: {}", e)))?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| CatalogError::upstream(format!("proxy body read failed: {}", e)))?;
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }
        if !status.is_success() {
            return Err(CatalogError::upstream(format!("proxy error {}", status)));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::upstream(format!("proxy returned invalid JSON: {}", e)))
    }

    async fn get_page(&self, path_and_query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let value: Value = self.get_json(path_and_query).await?;
        let reported_page = page_field(&value, "page");
        let total_pages = page_field(&value, "total_pages");
        let total_results = value.get("total_results").and_then(|v| v.as_u64());
        let results = SampleDocument::from_value(value)
            .map_err(|e| CatalogError::upstream(format!("proxy returned an unknown shape: {}", e)))?
            .into_movies();
        Ok(MoviePage {
            page: reported_page.unwrap_or(page),
            total_pages: total_pages.unwrap_or(1).max(1),
            total_results: total_results.unwrap_or(results.len() as u64),
            results,
        })
    }
}

/// Page counters that do not fit a `u32` are treated as absent.
fn page_field(value: &Value, key: &str) -> Option<u32> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

#[async_trait]
impl MovieSource for ProxiedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Proxy
    }

    async fn list_popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        self.get_page(&format!("/movie/popular?page={page}"), page)
            .await
    }

    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        self.get_page(
            &format!(
                "/search/movie?query={}&page={page}&include_adult=false",
                urlencoding::encode(query)
            ),
            page,
        )
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Movie, CatalogError> {
        let raw: TmdbMovieRecord = self.get_json(&format!("/movie/{id}")).await?;
        Ok(normalize(SourceRecord::Primary(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn oversized_page_counters_are_ignored() {
        let body = json!({ "page": 3, "total_pages": 5_000_000_000u64, "total_results": 7 });
        assert_eq!(page_field(&body, "page"), Some(3));
        assert_eq!(page_field(&body, "total_pages"), None);
        assert_eq!(page_field(&body, "missing"), None);
        assert_eq!(page_field(&json!({ "page": "2" }), "page"), None);
    }

    #[test]
    fn base_url_is_trimmed() {
        let source = ProxiedSource::new("http://localhost:3000/");
        assert_eq!(source.base, "http://localhost:3000");
    }
}
