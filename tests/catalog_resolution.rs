use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use movie_explorer::catalog::Catalog;
use movie_explorer::error::CatalogError;
use movie_explorer::models::{Movie, MoviePage};
use movie_explorer::normalize::derive_id;
use movie_explorer::policy::Mode;
use movie_explorer::proxy::{build_router, ProxyState};
use movie_explorer::sources::{
    GhibliSource, MovieSource, ProxiedSource, SampleSource, SourceKind, TmdbSource,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const TOTORO_ID: &str = "58611129-2dbc-4a81-a72f-77ddfc1b1b49";
const SPIRITED_AWAY_ID: &str = "dc2e6bd1-8156-4886-adff-b39e6043af0c";
const DEAD_MIRROR: &str = "http://127.0.0.1:1";
const TOTORO_POSTER: &str =
    "https://image.tmdb.org/t/p/w600_and_h900_bestv2/rtGDOeG9LzoerkDGZF9dnVeLppL.jpg";

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{}", addr)
}

fn ghibli_films() -> Value {
    json!([
        {
            "id": TOTORO_ID,
            "title": "My Neighbor Totoro",
            "description": "Two sisters move to the country with their father.",
            "release_date": "1988",
            "rt_score": "93",
            "image": TOTORO_POSTER
        },
        {
            "id": SPIRITED_AWAY_ID,
            "title": "Spirited Away",
            "description": "Chihiro wanders into a world of spirits.",
            "release_date": "2001",
            "rt_score": "97"
        }
    ])
}

async fn ghibli_mirror() -> String {
    serve(Router::new().route("/films", get(|| async { Json(ghibli_films()) }))).await
}

/// Films whose optional fields carry nulls and numbers instead of strings.
async fn loosely_typed_mirror() -> String {
    let films = json!([
        {
            "id": TOTORO_ID,
            "title": "My Neighbor Totoro",
            "description": null,
            "rt_score": 93,
            "image": null
        },
        {
            "id": SPIRITED_AWAY_ID,
            "title": "Spirited Away",
            "description": "Chihiro wanders into a world of spirits.",
            "release_date": 2001,
            "rt_score": "97"
        }
    ]);
    serve(Router::new().route(
        "/films",
        get(move || {
            let films = films.clone();
            async move { Json(films) }
        }),
    ))
    .await
}

async fn broken_mirror() -> String {
    serve(Router::new().route(
        "/films",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
    ))
    .await
}

/// Fake upstream catalog API: popular/search work, `/movie/550` returns `status`.
async fn tmdb_upstream(movie_status: StatusCode) -> String {
    let app = Router::new()
        .route(
            "/movie/popular",
            get(|| async {
                Json(json!({
                    "page": 1,
                    "results": [{ "id": 11, "title": "Star Wars", "vote_average": 8.2 }],
                    "total_pages": 1,
                    "total_results": 1
                }))
            }),
        )
        .route(
            "/movie/:id",
            get(move || async move {
                (movie_status, Json(json!({ "status_message": "nope" })))
            }),
        );
    serve(app).await
}

struct CountingSource {
    kind: SourceKind,
    calls: AtomicUsize,
    inner: Arc<dyn MovieSource>,
}

impl CountingSource {
    fn wrap(kind: SourceKind, inner: Arc<dyn MovieSource>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: AtomicUsize::new(0),
            inner,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MovieSource for CountingSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }
    async fn list_popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_popular(page).await
    }
    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search(query, page).await
    }
    async fn get_by_id(&self, id: i64) -> Result<Movie, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }
}

fn sample() -> Arc<CountingSource> {
    CountingSource::wrap(SourceKind::Sample, Arc::new(SampleSource::bundled()))
}

fn anonymous_catalog(mirrors: Vec<String>, sample: Arc<CountingSource>) -> Catalog {
    Catalog::direct(None, Arc::new(GhibliSource::new(mirrors)), sample)
}

#[tokio::test]
async fn anonymous_search_filters_public_dataset() {
    let mirror = ghibli_mirror().await;
    let sample = sample();
    let catalog = anonymous_catalog(vec![mirror], sample.clone());
    assert_eq!(catalog.mode(), Mode::Anonymous);

    let page = catalog.search("totoro", 1).await.expect("search");
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].title, "My Neighbor Totoro");
    assert_eq!(page.results[0].id, derive_id(TOTORO_ID));
    assert!((page.results[0].vote_average - 9.3).abs() < 1e-9);
    assert_eq!(page.total_results, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(sample.calls(), 0);
}

#[tokio::test]
async fn loosely_typed_films_are_served_from_the_live_mirror() {
    let mirror = loosely_typed_mirror().await;
    let sample = sample();
    let catalog = anonymous_catalog(vec![mirror], sample.clone());

    let page = catalog.list_popular(1).await.expect("popular");
    let titles: Vec<&str> = page.results.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["My Neighbor Totoro", "Spirited Away"]);
    assert!((page.results[0].vote_average - 9.3).abs() < 1e-9);
    assert_eq!(page.results[0].overview, "");
    assert_eq!(page.results[0].poster_path, None);
    assert_eq!(page.results[1].release_date, "2001");

    let movie = catalog
        .get_movie(derive_id(SPIRITED_AWAY_ID))
        .await
        .expect("lookup in live dataset");
    assert_eq!(movie.title, "Spirited Away");
    assert!((movie.vote_average - 9.7).abs() < 1e-9);
    assert_eq!(sample.calls(), 0);
}

#[tokio::test]
async fn mirrors_are_tried_in_order() {
    let broken = broken_mirror().await;
    let working = ghibli_mirror().await;
    let catalog = anonymous_catalog(vec![DEAD_MIRROR.to_string(), broken, working], sample());

    let page = catalog.list_popular(1).await.expect("popular");
    assert_eq!(page.total_results, 2);
    assert_eq!(page.results[1].title, "Spirited Away");
}

#[tokio::test]
async fn unreachable_mirrors_fall_back_to_sample_for_lists() {
    let sample = sample();
    let catalog = anonymous_catalog(vec![DEAD_MIRROR.to_string()], sample.clone());

    let page = catalog.list_popular(1).await.expect("popular from sample");
    assert!(!page.results.is_empty());
    assert_eq!(page.page, 1);
    let expected = SampleSource::bundled().popular_movies().expect("sample");
    assert_eq!(page.results, expected[..page.results.len()].to_vec());

    let search = catalog.search("matrix", 1).await.expect("search from sample");
    assert_eq!(search.results.len(), 1);
    assert_eq!(search.results[0].title, "The Matrix");
    assert_eq!(sample.calls(), 2);
}

#[tokio::test]
async fn page_zero_is_read_as_the_first_page() {
    let mirror = ghibli_mirror().await;
    let catalog = anonymous_catalog(vec![mirror], sample());

    let popular = catalog.list_popular(0).await.expect("popular");
    assert_eq!(popular.page, 1);
    assert_eq!(popular.results.len(), 2);

    let search = catalog.search("spirited", 0).await.expect("search");
    assert_eq!(search.page, 1);
    assert_eq!(search.results[0].title, "Spirited Away");
}

#[tokio::test]
async fn anonymous_lookup_resolves_derived_id() {
    let mirror = ghibli_mirror().await;
    let catalog = anonymous_catalog(vec![mirror], sample());

    let movie = catalog
        .get_movie(derive_id(SPIRITED_AWAY_ID))
        .await
        .expect("lookup");
    assert_eq!(movie.title, "Spirited Away");
    assert_eq!(movie.poster_path, None);
}

#[tokio::test]
async fn anonymous_lookup_miss_does_not_consult_sample() {
    let mirror = ghibli_mirror().await;
    let sample = sample();
    let catalog = anonymous_catalog(vec![mirror], sample.clone());

    // 550 exists in the sample set, but the public dataset answered.
    let result = catalog.get_movie(550).await;
    assert!(matches!(result, Err(CatalogError::NotFound)));
    assert_eq!(sample.calls(), 0);
}

#[tokio::test]
async fn anonymous_lookup_uses_sample_when_dataset_is_empty() {
    let sample = sample();
    let catalog = anonymous_catalog(vec![DEAD_MIRROR.to_string()], sample.clone());

    let movie = catalog.get_movie(550).await.expect("sample lookup");
    assert_eq!(movie.title, "Fight Club");

    let missing = catalog.get_movie(424_242).await;
    assert!(matches!(missing, Err(CatalogError::NotFound)));
    assert_eq!(sample.calls(), 2);
}

#[tokio::test]
async fn credentialed_lookup_failure_is_surfaced() {
    let upstream = tmdb_upstream(StatusCode::INTERNAL_SERVER_ERROR).await;
    let sample = sample();
    let catalog = Catalog::direct(
        Some(Arc::new(TmdbSource::new("key", upstream))),
        Arc::new(GhibliSource::new(vec![DEAD_MIRROR.to_string()])),
        sample.clone(),
    );
    assert_eq!(catalog.mode(), Mode::Credentialed);

    let result = catalog.get_movie(550).await;
    assert!(matches!(result, Err(CatalogError::UpstreamUnavailable(_))));
    assert_eq!(sample.calls(), 0);
}

#[tokio::test]
async fn credentialed_lookup_404_is_not_found() {
    let upstream = tmdb_upstream(StatusCode::NOT_FOUND).await;
    let sample = sample();
    let catalog = Catalog::direct(
        Some(Arc::new(TmdbSource::new("key", upstream))),
        Arc::new(GhibliSource::new(vec![DEAD_MIRROR.to_string()])),
        sample.clone(),
    );

    let result = catalog.get_movie(550).await;
    assert!(matches!(result, Err(CatalogError::NotFound)));
    assert_eq!(sample.calls(), 0);
}

#[tokio::test]
async fn credentialed_lists_use_primary_then_sample() {
    let upstream = tmdb_upstream(StatusCode::OK).await;
    let sample = sample();
    let catalog = Catalog::direct(
        Some(Arc::new(TmdbSource::new("key", upstream))),
        Arc::new(GhibliSource::new(vec![DEAD_MIRROR.to_string()])),
        sample.clone(),
    );

    let popular = catalog.list_popular(1).await.expect("popular");
    assert_eq!(popular.results[0].title, "Star Wars");
    assert_eq!(sample.calls(), 0);

    // The fake upstream has no search route, so search falls back.
    let search = catalog.search("fight", 1).await.expect("search");
    assert_eq!(search.results[0].title, "Fight Club");
    assert_eq!(sample.calls(), 1);
}

#[tokio::test]
async fn credentialed_lists_survive_unreachable_primary() {
    let sample = sample();
    let catalog = Catalog::direct(
        Some(Arc::new(TmdbSource::new("key", DEAD_MIRROR))),
        Arc::new(GhibliSource::new(vec![DEAD_MIRROR.to_string()])),
        sample.clone(),
    );
    let page = catalog.list_popular(1).await.expect("sample page");
    assert!(!page.results.is_empty());
    assert_eq!(sample.calls(), 1);
}

#[tokio::test]
async fn favorites_skip_ids_that_no_longer_resolve() {
    let catalog = anonymous_catalog(vec![DEAD_MIRROR.to_string()], sample());
    let movies = catalog.resolve_favorites(&[550, 99_999, 680, 550]).await;
    let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Fight Club", "Pulp Fiction"]);
}

#[tokio::test]
async fn proxied_catalog_goes_through_the_edge_proxy() {
    let proxy = serve(build_router(ProxyState {
        upstream: None,
        sample: Arc::new(SampleSource::bundled()),
    }))
    .await;
    let catalog = Catalog::proxied(Arc::new(ProxiedSource::new(proxy)));
    assert_eq!(catalog.mode(), Mode::Proxied);

    let popular = catalog.list_popular(1).await.expect("popular via proxy");
    assert!(!popular.results.is_empty());

    let found = catalog.search("inception", 1).await.expect("search via proxy");
    assert_eq!(found.total_results, 1);
    assert_eq!(found.results[0].id, 27205);

    let movie = catalog.get_movie(603).await.expect("movie via proxy");
    assert_eq!(movie.title, "The Matrix");

    let missing = catalog.get_movie(12_345_678).await;
    assert!(matches!(missing, Err(CatalogError::NotFound)));
}
