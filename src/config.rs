use std::time::Duration;

use crate::{ClientOptions, Result, TrinoDriftError};

/// Process-level engine configuration.
///
/// Mirrors the `TRINO_*` environment variables. Build it once and hand it
/// to [`crate::TrinoClient::from_config`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    /// Catalog used when a statement carries no override.
    pub catalog: String,
    /// Schema used when a statement carries no override.
    pub schema: String,
    /// Identity sent in the user header.
    pub user: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub debug: bool,
    pub enable_cache: bool,
    /// Result cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8080,
            catalog: "mysql".to_owned(),
            schema: "default".to_owned(),
            user: "trino".to_owned(),
            timeout_secs: 30,
            debug: false,
            enable_cache: false,
            cache_ttl_secs: 300,
        }
    }
}

impl EngineConfig {
    /// Reads configuration from the environment.
    ///
    /// Reads `TRINO_HOST`, `TRINO_PORT`, `TRINO_CATALOG`, `TRINO_SCHEMA`,
    /// `TRINO_USER`, `TRINO_TIMEOUT`, `TRINO_DEBUG`, `TRINO_ENABLE_CACHE`
    /// and `TRINO_CACHE_TTL`. Unset variables keep their defaults; set but
    /// unparsable numeric or boolean values are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(host) = get("TRINO_HOST") {
            config.host = host;
        }
        if let Some(port) = get("TRINO_PORT") {
            config.port = parse_number("TRINO_PORT", &port)?;
        }
        if let Some(catalog) = get("TRINO_CATALOG") {
            config.catalog = catalog;
        }
        if let Some(schema) = get("TRINO_SCHEMA") {
            config.schema = schema;
        }
        if let Some(user) = get("TRINO_USER") {
            config.user = user;
        }
        if let Some(timeout) = get("TRINO_TIMEOUT") {
            config.timeout_secs = parse_number("TRINO_TIMEOUT", &timeout)?;
        }
        if let Some(debug) = get("TRINO_DEBUG") {
            config.debug = parse_flag("TRINO_DEBUG", &debug)?;
        }
        if let Some(enable) = get("TRINO_ENABLE_CACHE") {
            config.enable_cache = parse_flag("TRINO_ENABLE_CACHE", &enable)?;
        }
        if let Some(ttl) = get("TRINO_CACHE_TTL") {
            config.cache_ttl_secs = parse_number("TRINO_CACHE_TTL", &ttl)?;
        }

        Ok(config)
    }

    /// Engine base URL, e.g. `http://localhost:8080`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Cache TTL, or `None` when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.enable_cache
            .then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    /// Transport options derived from this configuration.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout_ms: self.timeout_secs.saturating_mul(1_000),
            debug: self.debug,
            ..ClientOptions::default()
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|err| TrinoDriftError::Config(format!("invalid {key} '{value}': {err}")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TrinoDriftError::Config(format!(
            "invalid {key} '{other}': expected a boolean"
        ))),
    }
}
