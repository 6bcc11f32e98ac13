use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{MovieSource, SourceKind};
use crate::error::CatalogError;
use crate::models::{Movie, MoviePage};
use crate::normalize::{normalize, SourceRecord, TmdbListResponse, TmdbMovieRecord};

/// Primary catalog API adapter. Never falls back on its own.
#[derive(Debug, Clone)]
pub struct TmdbSource {
    client: Client,
    api_key: String,
    base: String,
}

/// Upstream response kept byte-for-byte for verbatim forwarding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TmdbSource {
    pub fn new(api_key: impl Into<String>, base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key, base)
    }

    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Target URL for `path`, keeping the caller's query but replacing any `api_key`.
    pub fn upstream_url(&self, path: &str, raw_query: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base, path))
            .with_context(|| format!("invalid upstream path {}", path))?;
        let kept: Vec<(String, String)> = match raw_query {
            Some(q) if !q.is_empty() => {
                url.set_query(Some(q));
                url.query_pairs()
                    .filter(|(k, _)| k != "api_key")
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            }
            _ => Vec::new(),
        };
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("api_key", &self.api_key);
        Ok(url)
    }

    pub async fn fetch_raw(&self, url: Url) -> Result<RawResponse, reqwest::Error> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = res.bytes().await?.to_vec();
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// Façade request URL; every parameter, the credential included, is form-encoded.
    fn request_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, CatalogError> {
        let mut url = Url::parse(&format!("{}{}", self.base, path))
            .map_err(|e| CatalogError::upstream(format!("{} is not a valid URL: {}", path, e)))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("api_key", &self.api_key);
        Ok(url)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = self.request_url(path, params)?;
        debug!("Primary catalog request {}", path);
        let res = self.client.get(url).send().await.map_err(|e| {
            CatalogError::upstream(format!("{} request failed: {}", path, e.without_url()))
        })?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| {
            CatalogError::upstream(format!("{} body read failed: {}", path, e.without_url()))
        })?;
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }
        if !status.is_success() {
            return Err(CatalogError::upstream(format!(
                "{} -> status {}",
                path, status
            )));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::upstream(format!("{} returned invalid JSON: {}", path, e)))
    }
}

fn page_from_response(data: TmdbListResponse, requested: u32) -> MoviePage {
    let results: Vec<Movie> = data
        .results
        .into_iter()
        .map(|r| normalize(SourceRecord::Primary(r)))
        .collect();
    MoviePage {
        page: data.page.unwrap_or(requested),
        total_pages: data.total_pages.unwrap_or(1).max(1),
        total_results: data.total_results.unwrap_or(results.len() as u64),
        results,
    }
}

#[async_trait]
impl MovieSource for TmdbSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Primary
    }

    async fn list_popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        let data: TmdbListResponse = self
            .get_json("/movie/popular", &[("page", page.to_string())])
            .await?;
        Ok(page_from_response(data, page))
    }

    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let data: TmdbListResponse = self
            .get_json(
                "/search/movie",
                &[
                    ("query", query.to_string()),
                    ("page", page.to_string()),
                    ("include_adult", "false".to_string()),
                ],
            )
            .await?;
        Ok(page_from_response(data, page))
    }

    async fn get_by_id(&self, id: i64) -> Result<Movie, CatalogError> {
        let raw: TmdbMovieRecord = self.get_json(&format!("/movie/{id}"), &[]).await?;
        Ok(normalize(SourceRecord::Primary(raw)))
    }
}
