use thiserror::Error;

/// Failure conditions shared by every catalog source and the façade.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not found")]
    NotFound,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("No catalog credential configured")]
    ConfigurationMissing,

    /// The source was reachable in principle but holds no data at all,
    /// e.g. every mirror of the public dataset is down.
    #[error("Source has no data")]
    SourceEmpty,

    #[error("Sample data unavailable: {0}")]
    SampleData(String),
}

impl CatalogError {
    pub fn upstream(message: impl Into<String>) -> Self {
        CatalogError::UpstreamUnavailable(message.into())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("user store failed: {0}")]
    Store(#[from] StoreError),
}
