use serde::{Deserialize, Serialize};

use crate::paginate::{paginate, PAGE_SIZE};
use crate::poster::{poster_url, PosterSize};

/// Canonical movie record every consumer of the catalog works with.
///
/// Field names on the wire follow the primary catalog API (`poster_path`,
/// `vote_average`, ...) so proxied responses and normalized records share one shape.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: String,
}

impl Movie {
    pub fn poster_url(&self, size: PosterSize) -> Option<String> {
        poster_url(self.poster_path.as_deref(), size)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u64,
}

impl MoviePage {
    /// Builds a page out of a complete in-memory collection.
    pub fn from_collection(movies: &[Movie], page: u32) -> Self {
        let sliced = paginate(movies, page, PAGE_SIZE);
        MoviePage {
            page,
            results: sliced.items,
            total_pages: sliced.total_pages,
            total_results: movies.len() as u64,
        }
    }
}
