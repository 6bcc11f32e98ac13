use anyhow::{Context, Result};
use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::sources::{MovieSource, SampleSource, TmdbSource};

/// Shared, read-only state of the edge proxy. No request mutates it.
#[derive(Clone)]
pub struct ProxyState {
    /// Present only when a credential is configured.
    pub upstream: Option<Arc<TmdbSource>>,
    pub sample: Arc<SampleSource>,
}

impl ProxyState {
    pub fn from_config(config: &Config) -> Self {
        let upstream = config
            .credential()
            .ok()
            .map(|key| Arc::new(TmdbSource::new(key, config.tmdb_base.clone())));
        let sample = match &config.sample_dir {
            Some(dir) => SampleSource::from_dir(dir.clone()),
            None => SampleSource::bundled(),
        };
        Self {
            upstream,
            sample: Arc::new(sample),
        }
    }
}

/// Upstream path shapes the proxy treats differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogPath {
    Popular,
    Search,
    /// Anything under `/movie/` except `/movie/popular`; holds the text after the prefix.
    Movie(String),
    Other(String),
}

impl CatalogPath {
    pub fn parse(path: &str) -> Self {
        if path == "/movie/popular" {
            return CatalogPath::Popular;
        }
        if path == "/search/movie" {
            return CatalogPath::Search;
        }
        match path.strip_prefix("/movie/") {
            Some(rest) => CatalogPath::Movie(rest.to_string()),
            None => CatalogPath::Other(path.to_string()),
        }
    }

    fn is_single_movie(&self) -> bool {
        matches!(self, CatalogPath::Movie(_))
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let state = ProxyState::from_config(&config);
    if state.upstream.is_some() {
        info!("Catalog credential configured; proxying to {}", config.tmdb_base);
    } else {
        warn!("No catalog credential configured; every request is served from sample data");
    }

    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Proxy server failed")?;
    Ok(())
}

pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/*path", get(handle_proxy))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn handle_proxy(
    State(state): State<ProxyState>,
    Path(segments): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let path = format!("/{}", segments.trim_start_matches('/'));
    match proxy_request(&state, &path, query.as_deref()).await {
        Ok(response) => response,
        Err(err) => {
            error!("Route error for {}: {:#}", path, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Route error", "details": format!("{:#}", err) })),
            )
                .into_response()
        }
    }
}

async fn proxy_request(state: &ProxyState, path: &str, query: Option<&str>) -> Result<Response> {
    let target = CatalogPath::parse(path);

    let Some(upstream) = &state.upstream else {
        debug!("No credential; serving sample data for {}", path);
        return sample_response(&state.sample, &target, query).await;
    };

    let url = upstream.upstream_url(path, query)?;
    match upstream.fetch_raw(url).await {
        Ok(raw) if raw.status.is_success() => {
            debug!("Upstream {} -> {}", path, raw.status);
            let content_type = raw
                .content_type
                .as_deref()
                .and_then(|v| HeaderValue::from_str(v).ok())
                .unwrap_or_else(|| HeaderValue::from_static("application/json"));
            let status = StatusCode::from_u16(raw.status.as_u16()).unwrap_or(StatusCode::OK);
            Ok((status, [(header::CONTENT_TYPE, content_type)], raw.body).into_response())
        }
        Ok(raw) => {
            warn!("Upstream {} returned status {}", path, raw.status);
            if target.is_single_movie() {
                return Ok(not_found());
            }
            sample_response(&state.sample, &target, query).await
        }
        Err(e) => {
            warn!("Upstream request for {} failed: {}", path, e.without_url());
            if target.is_single_movie() {
                return Ok((
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Upstream error" })),
                )
                    .into_response());
            }
            sample_response(&state.sample, &target, query).await
        }
    }
}

async fn sample_response(
    sample: &SampleSource,
    target: &CatalogPath,
    query: Option<&str>,
) -> Result<Response> {
    let params = QueryParams::parse(query);
    let body = match target {
        CatalogPath::Popular => serde_json::to_value(sample.list_popular(params.page).await?)?,
        CatalogPath::Search => {
            serde_json::to_value(sample.search(&params.query, params.page).await?)?
        }
        CatalogPath::Movie(id) => {
            return Ok(match sample.find_movie(id)? {
                Some(movie) => (StatusCode::OK, Json(movie)).into_response(),
                None => not_found(),
            });
        }
        CatalogPath::Other(_) => sample.popular_document()?,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

#[derive(Debug, Clone, PartialEq)]
struct QueryParams {
    page: u32,
    query: String,
}

impl QueryParams {
    fn parse(raw: Option<&str>) -> Self {
        let mut params = QueryParams {
            page: 1,
            query: String::new(),
        };
        let Some(raw) = raw.filter(|q| !q.is_empty()) else {
            return params;
        };
        let Ok(url) = Url::parse(&format!("http://proxy.local/?{}", raw)) else {
            return params;
        };
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "page" => {
                    params.page = value.trim().parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1)
                }
                "query" => params.query = value.into_owned(),
                _ => {}
            }
        }
        params
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
