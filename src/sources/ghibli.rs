use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{filter_by_title, MovieSource, SourceKind};
use crate::error::CatalogError;
use crate::models::{Movie, MoviePage};
use crate::normalize::{derive_id, normalize, GhibliFilm, SourceRecord};

/// Public Studio Ghibli dataset, fetched whole from the first mirror that answers.
#[derive(Debug, Clone)]
pub struct GhibliSource {
    client: Client,
    mirrors: Vec<String>,
}

impl GhibliSource {
    pub fn new(mirrors: Vec<String>) -> Self {
        Self::with_client(Client::new(), mirrors)
    }

    pub fn with_client(client: Client, mirrors: Vec<String>) -> Self {
        Self { client, mirrors }
    }

    /// Complete film list, or an empty list when every mirror fails.
    pub async fn fetch_films(&self) -> Vec<GhibliFilm> {
        for base in &self.mirrors {
            match self.fetch_from(base).await {
                Ok(films) => {
                    debug!("Loaded {} films from {}", films.len(), base);
                    return films;
                }
                Err(e) => warn!("Ghibli fetch failed for {}: {:#}", base, e),
            }
        }
        warn!("Ghibli API appears to be unreachable; returning empty dataset");
        Vec::new()
    }

    async fn fetch_from(&self, base: &str) -> Result<Vec<GhibliFilm>> {
        let url = format!("{}/films", base.trim_end_matches('/'));
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("status {}", status));
        }
        let bytes = res.bytes().await.context("reading body failed")?;
        let records: Vec<Value> = serde_json::from_slice(&bytes).context("JSON parse failed")?;
        Ok(records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<GhibliFilm>(record) {
                Ok(film) => Some(film),
                Err(e) => {
                    warn!("Skipping unreadable film record from {}: {}", base, e);
                    None
                }
            })
            .collect())
    }

    async fn movies(&self) -> Result<Vec<Movie>, CatalogError> {
        let films = self.fetch_films().await;
        if films.is_empty() {
            return Err(CatalogError::SourceEmpty);
        }
        Ok(films
            .into_iter()
            .map(|f| normalize(SourceRecord::Secondary(f)))
            .collect())
    }
}

#[async_trait]
impl MovieSource for GhibliSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Secondary
    }

    async fn list_popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        let movies = self.movies().await?;
        Ok(MoviePage::from_collection(&movies, page))
    }

    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let movies = filter_by_title(self.movies().await?, query);
        Ok(MoviePage::from_collection(&movies, page))
    }

    async fn get_by_id(&self, id: i64) -> Result<Movie, CatalogError> {
        let films = self.fetch_films().await;
        if films.is_empty() {
            return Err(CatalogError::SourceEmpty);
        }
        films
            .into_iter()
            .find(|f| derive_id(&f.id_text()) == id)
            .map(|f| normalize(SourceRecord::Secondary(f)))
            .ok_or(CatalogError::NotFound)
    }
}
