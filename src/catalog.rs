use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::CatalogError;
use crate::models::{Movie, MoviePage};
use crate::policy::{self, Mode, Operation};
use crate::sources::{
    GhibliSource, MovieSource, ProxiedSource, SampleSource, SourceKind, TmdbSource,
};

/// Single entry point for catalog reads. Holds no mutable state, so
/// concurrent calls are independent.
#[derive(Clone)]
pub struct Catalog {
    mode: Mode,
    sources: HashMap<SourceKind, Arc<dyn MovieSource>>,
}

impl Catalog {
    /// Direct access to the sources; `primary` is present only with a credential.
    pub fn direct(
        primary: Option<Arc<dyn MovieSource>>,
        secondary: Arc<dyn MovieSource>,
        sample: Arc<dyn MovieSource>,
    ) -> Self {
        let mode = if primary.is_some() {
            Mode::Credentialed
        } else {
            Mode::Anonymous
        };
        let mut sources = HashMap::new();
        if let Some(p) = primary {
            sources.insert(SourceKind::Primary, p);
        }
        sources.insert(SourceKind::Secondary, secondary);
        sources.insert(SourceKind::Sample, sample);
        Self { mode, sources }
    }

    /// Every call goes through an edge proxy.
    pub fn proxied(proxy: Arc<dyn MovieSource>) -> Self {
        Self {
            mode: Mode::Proxied,
            sources: HashMap::from([(SourceKind::Proxy, proxy)]),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(base) = &config.proxy_base {
            info!("Catalog routed through proxy at {}", base);
            return Ok(Self::proxied(Arc::new(ProxiedSource::new(base.clone()))));
        }
        let primary: Option<Arc<dyn MovieSource>> = match config.credential() {
            Ok(key) => Some(Arc::new(TmdbSource::new(key, config.tmdb_base.clone()))),
            Err(_) => {
                info!("No catalog credential configured; using public dataset and samples");
                None
            }
        };
        let sample: Arc<dyn MovieSource> = match &config.sample_dir {
            Some(dir) => Arc::new(SampleSource::from_dir(dir.clone())),
            None => Arc::new(SampleSource::bundled()),
        };
        Ok(Self::direct(
            primary,
            Arc::new(GhibliSource::new(config.ghibli_mirrors.clone())),
            sample,
        ))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn source(&self, kind: SourceKind) -> Result<&dyn MovieSource, CatalogError> {
        self.sources
            .get(&kind)
            .map(|s| s.as_ref())
            .ok_or(CatalogError::ConfigurationMissing)
    }

    /// Pages are 1-based; page 0 is read as page 1.
    pub async fn list_popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        let page = page.max(1);
        let op = Operation::ListPopular;
        policy::resolve(op, policy::plan(op, self.mode), move |kind| async move {
            self.source(kind)?.list_popular(page).await
        })
        .await
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let page = page.max(1);
        let op = Operation::Search;
        policy::resolve(op, policy::plan(op, self.mode), move |kind| async move {
            self.source(kind)?.search(query, page).await
        })
        .await
    }

    pub async fn get_movie(&self, id: i64) -> Result<Movie, CatalogError> {
        let op = Operation::GetById;
        policy::resolve(op, policy::plan(op, self.mode), move |kind| async move {
            self.source(kind)?.get_by_id(id).await
        })
        .await
    }

    /// Resolves favorite ids in order, skipping any that no longer resolve.
    pub async fn resolve_favorites(&self, ids: &[i64]) -> Vec<Movie> {
        let mut seen_ids = HashSet::new();
        let mut seen_movies = HashSet::new();
        let mut movies = Vec::new();
        for &id in ids {
            if !seen_ids.insert(id) {
                continue;
            }
            match self.get_movie(id).await {
                Ok(movie) => {
                    if seen_movies.insert(movie.id) {
                        movies.push(movie);
                    }
                }
                Err(e) => debug!("Skipping favorite {}: {}", id, e),
            }
        }
        movies
    }
}
