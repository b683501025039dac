/// Configures HTTP timeout, retry and polling behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
    /// Delay before following a continuation link when the previous
    /// fragment carried no rows.
    pub poll_interval_ms: u64,
    /// Optional deadline for a whole continuation chain. `None` lets a
    /// long-running query keep the call waiting.
    pub chain_deadline_ms: Option<u64>,
    /// Prefix for the user/catalog/schema headers, e.g. `X-Trino-` yields
    /// `X-Trino-User`.
    pub header_prefix: String,
    /// Log every submitted statement at info level.
    pub debug: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 0,
            retry_backoff_ms: 250,
            poll_interval_ms: 100,
            chain_deadline_ms: None,
            header_prefix: "X-Trino-".to_owned(),
            debug: false,
        }
    }
}
