use std::fmt;
use std::time::Duration;
#[cfg(feature = "tracing")]
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use tokio::time::sleep;

use crate::{
    cache::{CacheKey, ResultCache},
    normalize::normalize,
    queries,
    wire::{self, Accumulated},
    ClientOptions, ConnectionStatus, EngineConfig, Ident, QueryResult, Result, Statement,
    StatementExecutor, TrinoDriftError,
};

/// Path of the statement submission endpoint, relative to the base URL.
pub const STATEMENT_PATH: &str = "/v1/statement";

/// Which leg of the statement protocol a request belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exchange {
    /// `POST /v1/statement`; every accepted submission starts a new query.
    Submit,
    /// `GET nextUri`; safe to repeat.
    Poll,
}

#[derive(Clone)]
/// HTTP client for the engine's asynchronous statement protocol.
///
/// Each call submits one statement and follows `nextUri` links until the
/// engine stops returning one. Clones share the connection pool and the
/// optional result cache; configuration is fixed once built.
pub struct TrinoClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    catalog: Option<String>,
    schema: Option<String>,
    options: ClientOptions,
    cache: Option<ResultCache>,
}

impl fmt::Debug for TrinoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrinoClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("options", &self.options)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl TrinoClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:8080`)
    /// identifying itself as `user`.
    pub fn new(base_url: impl Into<String>, user: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            user: user.into(),
            catalog: None,
            schema: None,
            options: ClientOptions::default(),
            cache: None,
        }
    }

    /// Creates a client from process configuration, including the default
    /// catalog/schema and the result cache when enabled.
    pub fn from_config(config: &EngineConfig) -> Self {
        let client = Self::new(config.base_url(), &config.user)
            .with_defaults(&config.catalog, &config.schema)
            .with_options(config.client_options());
        match config.cache_ttl() {
            Some(ttl) => client.with_cache(ttl),
            None => client,
        }
    }

    /// Sets the catalog and schema used when a statement has no override.
    pub fn with_defaults(mut self, catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self.schema = Some(schema.into());
        self
    }

    /// Applies client options such as timeout, retry and polling behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Enables result caching keyed by statement text, catalog and schema.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(ResultCache::new(ttl));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Drops expired cache entries. Returns the number removed.
    pub fn purge_cache(&self) -> usize {
        self.cache.as_ref().map_or(0, ResultCache::purge_expired)
    }

    /// Empties the result cache, if any.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Runs SQL text with optional catalog/schema overrides.
    pub async fn query(
        &self,
        sql: &str,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<QueryResult> {
        let mut statement = Statement::new(sql);
        if let Some(catalog) = catalog {
            statement = statement.with_catalog(catalog);
        }
        if let Some(schema) = schema {
            statement = statement.with_schema(schema);
        }
        self.execute(&statement).await
    }

    /// Submits a statement and drains its continuation chain.
    ///
    /// Any failure along the chain discards the rows gathered so far.
    /// Dropping the returned future stops following links; the engine may
    /// keep running the query.
    pub async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        let catalog = statement.catalog().or(self.catalog.as_deref());
        let schema = statement.schema().or(self.schema.as_deref());

        let cache = self
            .cache
            .as_ref()
            .filter(|_| statement.is_cacheable());
        let cache_key = cache.map(|_| {
            CacheKey::new(
                statement.sql(),
                catalog.unwrap_or_default(),
                schema.unwrap_or_default(),
            )
        });
        if let (Some(cache), Some(key)) = (cache, &cache_key) {
            if let Some(hit) = cache.get(key) {
                #[cfg(feature = "tracing")]
                tracing::debug!(rows = hit.row_count, "statement served from cache");
                return Ok((*hit).clone());
            }
        }

        #[cfg(feature = "tracing")]
        if self.options.debug {
            tracing::info!(sql = statement.sql(), ?catalog, ?schema, "submitting statement");
        }

        #[cfg(feature = "tracing")]
        let started = Instant::now();
        let chain = self.run_chain(statement.sql(), catalog, schema);
        let accumulated = match self.options.chain_deadline_ms {
            Some(deadline_ms) => tokio::time::timeout(Duration::from_millis(deadline_ms), chain)
                .await
                .map_err(|_| TrinoDriftError::DeadlineExceeded {
                    sql: statement.sql().to_owned(),
                    deadline_ms,
                })??,
            None => chain.await?,
        };
        let result = normalize(accumulated);

        #[cfg(feature = "tracing")]
        if self.options.debug {
            tracing::info!(
                rows = result.row_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "statement finished"
            );
        }

        if let (Some(cache), Some(key)) = (cache, cache_key) {
            cache.insert(key, result.clone());
        }
        Ok(result)
    }

    /// Runs `SELECT 1` and reports whether the engine answered.
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.query("SELECT 1 AS test", None, None).await {
            Ok(result) => ConnectionStatus {
                success: true,
                message: "Successfully connected to the engine".to_owned(),
                result: Some(result),
                error: None,
            },
            Err(err) => ConnectionStatus {
                success: false,
                message: "Failed to connect to the engine".to_owned(),
                result: None,
                error: Some(err.to_string()),
            },
        }
    }

    pub async fn list_catalogs(&self) -> Result<QueryResult> {
        self.execute(&queries::show_catalogs()).await
    }

    /// Lists schemas of `catalog`, or of the default catalog.
    pub async fn list_schemas(&self, catalog: Option<&Ident>) -> Result<QueryResult> {
        let catalog = self.resolve_catalog(catalog)?;
        self.execute(&queries::show_schemas(&catalog)).await
    }

    /// Lists tables of `catalog.schema`, falling back to the defaults.
    pub async fn list_tables(
        &self,
        catalog: Option<&Ident>,
        schema: Option<&Ident>,
    ) -> Result<QueryResult> {
        let catalog = self.resolve_catalog(catalog)?;
        let schema = self.resolve_schema(schema)?;
        self.execute(&queries::show_tables(&catalog, &schema)).await
    }

    pub async fn describe_table(
        &self,
        table: &Ident,
        catalog: Option<&Ident>,
        schema: Option<&Ident>,
    ) -> Result<QueryResult> {
        let catalog = self.resolve_catalog(catalog)?;
        let schema = self.resolve_schema(schema)?;
        self.execute(&queries::describe_table(&catalog, &schema, table))
            .await
    }

    fn resolve_catalog(&self, catalog: Option<&Ident>) -> Result<Ident> {
        match catalog {
            Some(catalog) => Ok(catalog.clone()),
            None => Ident::new(self.catalog.clone().unwrap_or_default()),
        }
    }

    fn resolve_schema(&self, schema: Option<&Ident>) -> Result<Ident> {
        match schema {
            Some(schema) => Ok(schema.clone()),
            None => Ident::new(self.schema.clone().unwrap_or_default()),
        }
    }

    async fn run_chain(
        &self,
        sql: &str,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Accumulated> {
        let submit_url = format!("{}{}", self.base_url, STATEMENT_PATH);
        let mut fragment = self
            .send_with_retry(sql, Exchange::Submit, || {
                let mut request = self
                    .http
                    .post(&submit_url)
                    .header(self.header_name("User"), &self.user)
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(sql.to_owned());
                if let Some(catalog) = catalog {
                    request = request.header(self.header_name("Catalog"), catalog);
                }
                if let Some(schema) = schema {
                    request = request.header(self.header_name("Schema"), schema);
                }
                request
            })
            .await?;

        let mut accumulated = Accumulated::default();
        #[cfg(feature = "tracing")]
        let mut polls = 0usize;
        loop {
            if let Some(error) = fragment.error.take() {
                return Err(TrinoDriftError::QueryFailed {
                    sql: sql.to_owned(),
                    message: error.message,
                    error_name: error.error_name,
                });
            }

            let next_uri = fragment.next_uri.take();
            let carried_rows = fragment.data.as_ref().is_some_and(|rows| !rows.is_empty());
            accumulated.merge(fragment);

            // No link means the chain is drained; a link with no rows yet
            // means the query is still running.
            let Some(next_uri) = next_uri else {
                break;
            };
            if !carried_rows {
                sleep(Duration::from_millis(self.options.poll_interval_ms)).await;
            }

            #[cfg(feature = "tracing")]
            {
                polls += 1;
                tracing::debug!(polls, rows = accumulated.data.len(), "following continuation link");
            }

            fragment = self
                .send_with_retry(sql, Exchange::Poll, || {
                    self.http
                        .get(&next_uri)
                        .header(self.header_name("User"), &self.user)
                })
                .await?;
        }

        Ok(accumulated)
    }

    async fn send_with_retry<F>(
        &self,
        sql: &str,
        exchange: Exchange,
        build: F,
    ) -> Result<wire::QueryResults>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            let response = build()
                .timeout(Duration::from_millis(self.options.timeout_ms))
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|source| TrinoDriftError::Transport {
                            sql: sql.to_owned(),
                            source,
                        })?;

                    if !status.is_success() {
                        if self.should_retry_status(status) && attempt < self.options.max_retries {
                            self.wait_before_retry(attempt).await;
                            attempt += 1;
                            continue;
                        }

                        return Err(TrinoDriftError::Http {
                            sql: sql.to_owned(),
                            status: status.as_u16(),
                            body,
                        });
                    }

                    return serde_json::from_str::<wire::QueryResults>(&body).map_err(|err| {
                        TrinoDriftError::Protocol(format!(
                            "invalid statement response JSON: {err}; body: {body}"
                        ))
                    });
                }
                Err(err) => {
                    if self.should_retry_transport(exchange, &err)
                        && attempt < self.options.max_retries
                    {
                        self.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(TrinoDriftError::Transport {
                        sql: sql.to_owned(),
                        source: err,
                    });
                }
            }
        }
    }

    fn header_name(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.options.header_prefix)
    }

    fn should_retry_status(&self, status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }

    /// A submission is retried only when it provably never reached the
    /// engine; any later failure may have started the query already.
    fn should_retry_transport(&self, exchange: Exchange, err: &reqwest::Error) -> bool {
        match exchange {
            Exchange::Submit => err.is_connect(),
            Exchange::Poll => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
        }
    }

    /// Waits before the next retry attempt, with exponential backoff.
    async fn wait_before_retry(&self, attempt: usize) {
        let exp = attempt.min(16) as u32;
        let multiplier = 1u64 << exp;
        let delay_ms = self.options.retry_backoff_ms.saturating_mul(multiplier);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying statement request after {} ms", delay_ms);

        sleep(Duration::from_millis(delay_ms)).await;
    }
}

#[async_trait]
impl StatementExecutor for TrinoClient {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        TrinoClient::execute(self, statement).await
    }
}
