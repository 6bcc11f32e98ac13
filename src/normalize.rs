//! Maps every upstream record shape onto the canonical [`Movie`].
use serde::Deserialize;
use serde_json::Value;

use crate::models::Movie;

/// Record as served by the primary catalog API (and by the bundled samples).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbMovieRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<Value>,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Paginated list envelope of the primary catalog API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbListResponse {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub results: Vec<TmdbMovieRecord>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

/// Film record of the public Studio Ghibli dataset.
///
/// Everything except the id text is optional and loosely typed so that one
/// odd record cannot fail the whole mirror response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GhibliFilm {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_date: Option<Value>,
    #[serde(default)]
    pub rt_score: Option<Value>,
    #[serde(default)]
    pub image: Option<String>,
}

impl GhibliFilm {
    /// Source id as text; numeric ids are rendered the way JSON prints them.
    pub fn id_text(&self) -> String {
        value_text(&self.id).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub enum SourceRecord {
    Primary(TmdbMovieRecord),
    Secondary(GhibliFilm),
    Sample(TmdbMovieRecord),
}

pub fn normalize(record: SourceRecord) -> Movie {
    match record {
        SourceRecord::Primary(raw) | SourceRecord::Sample(raw) => Movie {
            id: raw.id,
            title: raw.title.unwrap_or_default(),
            overview: raw.overview.unwrap_or_default(),
            poster_path: raw.poster_path.filter(|p| !p.trim().is_empty()),
            vote_average: raw.vote_average.as_ref().map(score_value).unwrap_or(0.0),
            release_date: raw.release_date.unwrap_or_default(),
        },
        SourceRecord::Secondary(film) => Movie {
            id: derive_id(&film.id_text()),
            vote_average: film
                .rt_score
                .as_ref()
                .and_then(raw_score)
                .map(|score| clamp_vote(score / 10.0))
                .unwrap_or(0.0),
            title: film.title.unwrap_or_default(),
            overview: film.description.unwrap_or_default(),
            poster_path: film.image.filter(|p| !p.trim().is_empty()),
            release_date: film
                .release_date
                .as_ref()
                .and_then(value_text)
                .unwrap_or_default(),
        },
    }
}

/// Stable string-to-integer hash used as the id of public-dataset films.
///
/// Follows the classic `h = h * 31 + c` over UTF-16 code units where the
/// shift truncates to 32 bits, then takes the absolute value. Different
/// source ids may collide; nothing resolves collisions.
pub fn derive_id(source_id: &str) -> i64 {
    let mut h: i64 = 0;
    for unit in source_id.encode_utf16() {
        let shifted = (h as i32).wrapping_shl(5) as i64;
        h = shifted - h + unit as i64;
    }
    h.abs()
}

fn score_value(value: &Value) -> f64 {
    raw_score(value).map(clamp_vote).unwrap_or(0.0)
}

fn raw_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_score(s),
        _ => None,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_score(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clamp_vote(value: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        return 0.0;
    }
    value.min(10.0)
}
