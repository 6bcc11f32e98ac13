use async_trait::async_trait;
use std::fmt;

use crate::error::CatalogError;
use crate::models::{Movie, MoviePage};

mod ghibli;
mod proxied;
mod sample;
mod tmdb;

pub use ghibli::GhibliSource;
pub use proxied::ProxiedSource;
pub use sample::{SampleDocument, SampleSource};
pub use tmdb::{RawResponse, TmdbSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Authenticated primary catalog API.
    Primary,
    /// Public dataset served by a list of mirrors.
    Secondary,
    /// Fixed dataset bundled with the crate.
    Sample,
    /// Edge proxy standing in for the whole chain.
    Proxy,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Primary => "primary",
            SourceKind::Secondary => "secondary",
            SourceKind::Sample => "sample",
            SourceKind::Proxy => "proxy",
        };
        f.write_str(name)
    }
}

/// Uniform operation set every catalog data source exposes.
#[async_trait]
pub trait MovieSource: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn list_popular(&self, page: u32) -> Result<MoviePage, CatalogError>;
    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError>;
    async fn get_by_id(&self, id: i64) -> Result<Movie, CatalogError>;
}

/// Case-insensitive substring match on titles; a blank query matches everything.
pub(crate) fn filter_by_title(movies: Vec<Movie>, query: &str) -> Vec<Movie> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return movies;
    }
    movies
        .into_iter()
        .filter(|m| m.title.to_lowercase().contains(&needle))
        .collect()
}
