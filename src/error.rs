/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TrinoDriftError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error while running `{sql}`: {source}")]
    Transport {
        /// Statement whose request chain failed.
        sql: String,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status} while running `{sql}`: {body}")]
    Http {
        /// Statement whose request chain failed.
        sql: String,
        /// HTTP status returned by the engine.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Response could not be parsed as a statement fragment.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The engine accepted the statement but reported it as failed.
    #[error("query failed: {message}")]
    QueryFailed {
        /// Statement the engine rejected.
        sql: String,
        /// Engine error message.
        message: String,
        /// Engine-specific error name, e.g. `TABLE_NOT_FOUND`.
        error_name: Option<String>,
    },
    /// The request chain ran past the configured deadline.
    #[error("deadline of {deadline_ms} ms exceeded while running `{sql}`")]
    DeadlineExceeded {
        /// Statement whose chain was abandoned.
        sql: String,
        /// Configured chain deadline in milliseconds.
        deadline_ms: u64,
    },
    /// Referenced entity (e.g. a snapshot id) does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Catalog, schema or table name outside the safe identifier charset.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    /// Configuration value could not be parsed.
    #[error("config error: {0}")]
    Config(String),
    /// Snapshot store failure.
    #[error("snapshot store error: {0}")]
    Store(String),
}

impl TrinoDriftError {
    /// Returns `true` for failures reaching the engine at the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http { .. })
    }
}
