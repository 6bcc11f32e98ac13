use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::CatalogError;

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_GHIBLI_MIRRORS: [&str; 2] = [
    "https://ghibliapi.vercel.app",
    "https://ghibliapi.herokuapp.com",
];
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Explicit runtime configuration handed to the catalog and the proxy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server-only credential; wins over the public one.
    pub server_api_key: Option<String>,
    pub public_api_key: Option<String>,
    pub tmdb_base: String,
    pub ghibli_mirrors: Vec<String>,
    pub sample_dir: Option<PathBuf>,
    pub bind_addr: SocketAddr,
    pub proxy_base: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("BIND_ADDR")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw
            .trim()
            .parse()
            .with_context(|| format!("BIND_ADDR is not a socket address: {}", bind_raw))?;

        let ghibli_mirrors = lookup("GHIBLI_MIRRORS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_GHIBLI_MIRRORS.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            server_api_key: credential_value(lookup("TMDB_API_KEY")),
            public_api_key: credential_value(lookup("PUBLIC_TMDB_API_KEY")),
            tmdb_base: lookup("TMDB_BASE_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_TMDB_BASE.to_string()),
            ghibli_mirrors,
            sample_dir: lookup("SAMPLE_DATA_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            bind_addr,
            proxy_base: lookup("CATALOG_PROXY_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
        })
    }

    pub fn credential(&self) -> Result<&str, CatalogError> {
        self.server_api_key
            .as_deref()
            .or(self.public_api_key.as_deref())
            .ok_or(CatalogError::ConfigurationMissing)
    }
}

// Build tooling sometimes stringifies unset variables.
fn credential_value(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "undefined" && s != "null")
}
