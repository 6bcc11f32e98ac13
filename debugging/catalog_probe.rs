//! Run one catalog operation through the resolution policy and print the normalized result.
//! Usage:
//!   cargo run --bin catalog_probe -- popular [page]
//!   cargo run --bin catalog_probe -- search <query> [page]
//!   cargo run --bin catalog_probe -- movie <id>
//! Reads TMDB_API_KEY / PUBLIC_TMDB_API_KEY / CATALOG_PROXY_URL from the environment
//! (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use movie_explorer::catalog::Catalog;
use movie_explorer::config::Config;
use movie_explorer::models::Movie;
use movie_explorer::poster::PosterSize;
use serde_json::{json, Value};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ProbeKind {
    Popular,
    Search,
    Movie,
}

impl FromStr for ProbeKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "popular" => Ok(ProbeKind::Popular),
            "search" => Ok(ProbeKind::Search),
            "movie" => Ok(ProbeKind::Movie),
            _ => Err(anyhow::anyhow!("operation must be 'popular', 'search' or 'movie'")),
        }
    }
}

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin catalog_probe -- popular [page]");
    eprintln!("       cargo run --bin catalog_probe -- search <query> [page]");
    eprintln!("       cargo run --bin catalog_probe -- movie <id>");
    std::process::exit(1);
}

fn parse_page(arg: Option<&String>) -> Result<u32> {
    match arg {
        Some(raw) => raw.parse().context("page must be a positive integer"),
        None => Ok(1),
    }
}

fn movie_json(movie: &Movie) -> Value {
    json!({
        "id": movie.id,
        "title": movie.title,
        "overview": movie.overview,
        "release_date": movie.release_date,
        "vote_average": movie.vote_average,
        "poster_path": movie.poster_path,
        "poster_w342": movie.poster_url(PosterSize::W342),
        "poster_w500": movie.poster_url(PosterSize::W500),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let kind = ProbeKind::from_str(&args[1])?;
    let config = Config::from_env()?;
    let catalog = Catalog::from_config(&config)?;
    eprintln!("Resolution mode: {:?}", catalog.mode());

    let output = match kind {
        ProbeKind::Popular => {
            let page = parse_page(args.get(2))?;
            let data = catalog.list_popular(page).await?;
            json!({
                "page": data.page,
                "total_pages": data.total_pages,
                "total_results": data.total_results,
                "results": data.results.iter().map(movie_json).collect::<Vec<_>>(),
            })
        }
        ProbeKind::Search => {
            let Some(query) = args.get(2) else { usage() };
            let page = parse_page(args.get(3))?;
            let data = catalog.search(query, page).await?;
            json!({
                "query": query,
                "page": data.page,
                "total_pages": data.total_pages,
                "total_results": data.total_results,
                "results": data.results.iter().map(movie_json).collect::<Vec<_>>(),
            })
        }
        ProbeKind::Movie => {
            let Some(raw_id) = args.get(2) else { usage() };
            let id: i64 = raw_id.parse().context("id must be an integer")?;
            movie_json(&catalog.get_movie(id).await?)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
