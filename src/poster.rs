use std::fmt;
use std::str::FromStr;

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PosterSize {
    W92,
    W154,
    W185,
    #[default]
    W342,
    W500,
    W780,
    Original,
}

impl PosterSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosterSize::W92 => "w92",
            PosterSize::W154 => "w154",
            PosterSize::W185 => "w185",
            PosterSize::W342 => "w342",
            PosterSize::W500 => "w500",
            PosterSize::W780 => "w780",
            PosterSize::Original => "original",
        }
    }
}

impl fmt::Display for PosterSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosterSize {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "w92" => Ok(PosterSize::W92),
            "w154" => Ok(PosterSize::W154),
            "w185" => Ok(PosterSize::W185),
            "w342" => Ok(PosterSize::W342),
            "w500" => Ok(PosterSize::W500),
            "w780" => Ok(PosterSize::W780),
            "original" => Ok(PosterSize::Original),
            _ => Err(anyhow::anyhow!("unknown poster size '{}'", s)),
        }
    }
}

/// Absolute URLs pass through untouched; relative paths are composed onto the image CDN.
pub fn poster_url(path: Option<&str>, size: PosterSize) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    Some(format!("{IMAGE_BASE}/{size}{path}"))
}
