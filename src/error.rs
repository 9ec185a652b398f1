//! Error types for the onboarding engine.

use crate::model::ErrorDetails;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures raised by the network client.
///
/// Any HTTP status in `[400, 600)` is a `Server` error carrying whatever
/// structured details the body held (possibly empty). Body-decode failures
/// outside that range are `Decode`. Failures where no response was received
/// at all are `Transport`.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("no response received: {0}")]
    Transport(String),

    #[error("server returned {status}: {details:?}")]
    Server { status: u16, details: ErrorDetails },

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failures raised by the content item codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unknown content item type \"{0}\"")]
    UnknownItemType(String),

    #[error("invalid {item_type} fragment on item {item_id}: {source}")]
    InvalidFragment {
        item_type: &'static str,
        item_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("engine already initialized; initialize() runs once per instance")]
    AlreadyInitialized,

    #[error("missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
