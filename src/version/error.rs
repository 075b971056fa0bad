use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to fetch {url}. HTTP status: {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
