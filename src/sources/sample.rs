use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{filter_by_title, MovieSource, SourceKind};
use crate::error::CatalogError;
use crate::models::{Movie, MoviePage};
use crate::normalize::{normalize, SourceRecord, TmdbListResponse, TmdbMovieRecord};

pub const POPULAR_FILE: &str = "sample-popular.json";
pub const MOVIES_FILE: &str = "sample-movies.json";

const BUNDLED_POPULAR: &str = include_str!("../../data/sample-popular.json");
const BUNDLED_MOVIES: &str = include_str!("../../data/sample-movies.json");

/// Shapes a sample file may take on disk.
#[derive(Debug, Clone)]
pub enum SampleDocument {
    List(Vec<TmdbMovieRecord>),
    Page(TmdbListResponse),
    Single(TmdbMovieRecord),
}

impl SampleDocument {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.is_array() {
            return Ok(SampleDocument::List(serde_json::from_value(value)?));
        }
        if value.get("results").is_some() {
            return Ok(SampleDocument::Page(serde_json::from_value(value)?));
        }
        Ok(SampleDocument::Single(serde_json::from_value(value)?))
    }

    pub fn into_movies(self) -> Vec<Movie> {
        let records = match self {
            SampleDocument::List(records) => records,
            SampleDocument::Page(page) => page.results,
            SampleDocument::Single(record) => vec![record],
        };
        records
            .into_iter()
            .map(|r| normalize(SourceRecord::Sample(r)))
            .collect()
    }
}

#[derive(Debug)]
enum Origin {
    Bundled {
        popular: OnceCell<Value>,
        movies: OnceCell<Value>,
    },
    Directory(PathBuf),
}

/// Static sample dataset of last resort: a "popular" collection and a
/// "single movie" collection.
#[derive(Debug)]
pub struct SampleSource {
    origin: Origin,
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::bundled()
    }
}

impl SampleSource {
    pub fn bundled() -> Self {
        Self {
            origin: Origin::Bundled {
                popular: OnceCell::new(),
                movies: OnceCell::new(),
            },
        }
    }

    /// Reads both files from `dir` on every call.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::Directory(dir.into()),
        }
    }

    /// Popular collection exactly as stored.
    pub fn popular_document(&self) -> Result<Value, CatalogError> {
        match &self.origin {
            Origin::Bundled { popular, .. } => popular
                .get_or_try_init(|| parse_bundled(POPULAR_FILE, BUNDLED_POPULAR))
                .cloned(),
            Origin::Directory(dir) => read_file(dir, POPULAR_FILE),
        }
    }

    pub fn movies_document(&self) -> Result<Value, CatalogError> {
        match &self.origin {
            Origin::Bundled { movies, .. } => movies
                .get_or_try_init(|| parse_bundled(MOVIES_FILE, BUNDLED_MOVIES))
                .cloned(),
            Origin::Directory(dir) => read_file(dir, MOVIES_FILE),
        }
    }

    pub fn popular_movies(&self) -> Result<Vec<Movie>, CatalogError> {
        to_movies(POPULAR_FILE, self.popular_document()?)
    }

    pub fn single_movies(&self) -> Result<Vec<Movie>, CatalogError> {
        to_movies(MOVIES_FILE, self.movies_document()?)
    }

    /// Exact match of the textual id against the single-movie collection.
    pub fn find_movie(&self, id: &str) -> Result<Option<Movie>, CatalogError> {
        Ok(self
            .single_movies()?
            .into_iter()
            .find(|m| m.id.to_string() == id))
    }
}

fn parse_bundled(name: &str, raw: &str) -> Result<Value, CatalogError> {
    serde_json::from_str(raw)
        .map_err(|e| CatalogError::SampleData(format!("bundled {} is invalid: {}", name, e)))
}

fn read_file(dir: &Path, name: &str) -> Result<Value, CatalogError> {
    let path = dir.join(name);
    debug!("Reading sample data from {}", path.display());
    let raw = fs::read_to_string(&path)
        .map_err(|e| CatalogError::SampleData(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| CatalogError::SampleData(format!("{}: {}", path.display(), e)))
}

fn to_movies(name: &str, value: Value) -> Result<Vec<Movie>, CatalogError> {
    SampleDocument::from_value(value)
        .map(SampleDocument::into_movies)
        .map_err(|e| CatalogError::SampleData(format!("{} has an unexpected shape: {}", name, e)))
}

#[async_trait]
impl MovieSource for SampleSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Sample
    }

    async fn list_popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        let movies = self.popular_movies()?;
        Ok(MoviePage::from_collection(&movies, page))
    }

    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let movies = filter_by_title(self.popular_movies()?, query);
        Ok(MoviePage::from_collection(&movies, page))
    }

    async fn get_by_id(&self, id: i64) -> Result<Movie, CatalogError> {
        self.single_movies()?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or(CatalogError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bundled_collections_are_not_empty() {
        let sample = SampleSource::bundled();
        assert!(!sample.popular_movies().expect("popular").is_empty());
        assert!(!sample.single_movies().expect("movies").is_empty());
    }

    #[test]
    fn every_popular_id_resolves_as_a_single_movie() {
        let sample = SampleSource::bundled();
        let singles = sample.single_movies().expect("movies");
        for movie in sample.popular_movies().expect("popular") {
            assert!(
                singles.iter().any(|m| m.id == movie.id),
                "popular id {} missing from single-movie set",
                movie.id
            );
        }
    }

    #[tokio::test]
    async fn get_by_id_returns_exact_record_or_not_found() {
        let sample = SampleSource::bundled();
        let movie = sample.get_by_id(550).await.expect("fight club");
        assert_eq!(movie.id, 550);
        assert_eq!(movie.title, "Fight Club");

        let missing = sample.get_by_id(999_999_999).await;
        assert!(matches!(missing, Err(CatalogError::NotFound)));
    }

    #[test]
    fn find_movie_compares_id_text() {
        let sample = SampleSource::bundled();
        assert!(sample.find_movie("550").expect("lookup").is_some());
        assert!(sample.find_movie("550/credits").expect("lookup").is_none());
        assert!(sample.find_movie("abc").expect("lookup").is_none());
    }

    #[test]
    fn document_shapes_are_recognised() {
        let list = SampleDocument::from_value(json!([{ "id": 1, "title": "A" }])).unwrap();
        assert_eq!(list.into_movies().len(), 1);

        let page = SampleDocument::from_value(json!({
            "page": 1,
            "results": [{ "id": 1, "title": "A" }, { "id": 2, "title": "B" }]
        }))
        .unwrap();
        assert_eq!(page.into_movies().len(), 2);

        let single = SampleDocument::from_value(json!({ "id": 7, "title": "Solo" })).unwrap();
        let movies = single.into_movies();
        assert_eq!(movies[0].id, 7);
    }

    #[test]
    fn missing_directory_is_a_sample_data_fault() {
        let sample = SampleSource::from_dir("/nonexistent/sample-data-dir");
        assert!(matches!(
            sample.popular_movies(),
            Err(CatalogError::SampleData(_))
        ));
    }
}
