use thiserror::Error;

/// Terminal failures surfaced by the BallDontLie client.
///
/// Transient conditions (network errors, non-2xx statuses, 429 throttling,
/// malformed bodies) are retried internally and never reach the caller on
/// their own; what propagates is the exhausted budget or a pagination
/// invariant violation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every allowed attempt failed. `last_error` is absent when the server
    /// answered 429 on every attempt; throttling is reported as such rather
    /// than as the failure of any one attempt.
    #[error("request failed after {attempts} attempts: {}", .last_error.as_deref().unwrap_or("rate limited (HTTP 429)"))]
    RetriesExhausted {
        attempts: u32,
        last_error: Option<String>,
    },

    /// The server handed back a pagination cursor that was already requested
    /// in this collection run.
    #[error("pagination cursor {cursor} repeated; aborting to avoid an infinite loop")]
    CursorRepeated { cursor: i64 },
}

/// Configuration problems. The library only reports these; exiting the
/// process is the binary's decision.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "missing API key: set {} (or {}) in the environment",
        crate::config::API_KEY_ENV,
        crate::config::API_KEY_ENV_FALLBACK
    )]
    MissingApiKey,

    #[error("per_page must be between 1 and {max}, got {value}")]
    InvalidPerPage { value: u32, max: u32 },
}

/// CSV rendering failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv buffer error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv output was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
