//! Error taxonomy shared by the resolver, decoder, cache and snapshot store.

use thiserror::Error;

/// Result type alias for feed and archive operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Every core operation either completes or reports exactly one of these.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The route id is not served by any known feed endpoint.
    #[error("unsupported route_id: {0}")]
    UnsupportedRoute(String),

    /// A request parameter could not be parsed.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    /// Network failure or non-2xx response from the upstream feed.
    #[error("upstream fetch failed for {url}: {message}")]
    UpstreamFetch { url: String, message: String },

    /// Bytes were not a well-formed feed, or a stored blob failed to decompress.
    #[error("decode error: {0}")]
    Decode(String),

    /// No snapshot with this id.
    #[error("snapshot {0} not found")]
    NotFound(i64),

    /// Connection or query failure in the snapshot catalog.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Snapshot bytes could not be gzip-compressed for storage.
    #[error("snapshot compression failed: {0}")]
    Compress(#[source] std::io::Error),
}

impl FeedError {
    pub fn invalid_parameter(name: &str, message: impl std::fmt::Display) -> Self {
        FeedError::InvalidParameter {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn upstream(url: &str, err: impl std::fmt::Display) -> Self {
        FeedError::UpstreamFetch {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FeedError::UnsupportedRoute(_) => "UNSUPPORTED_ROUTE",
            FeedError::InvalidParameter { .. } => "INVALID_PARAMETER",
            FeedError::UpstreamFetch { .. } => "UPSTREAM_FETCH_ERROR",
            FeedError::Decode(_) => "DECODE_ERROR",
            FeedError::NotFound(_) => "NOT_FOUND",
            FeedError::Storage(_) | FeedError::Compress(_) => "STORAGE_ERROR",
        }
    }
}

impl From<prost::DecodeError> for FeedError {
    fn from(err: prost::DecodeError) -> Self {
        FeedError::Decode(err.to_string())
    }
}
