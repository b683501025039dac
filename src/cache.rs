//! Statement result caching with TTL.
//!
//! Keys are the statement text together with the effective catalog and
//! schema, so the same SQL run against two catalogs never shares an entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::QueryResult;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    sql: String,
    catalog: String,
    schema: String,
}

impl CacheKey {
    pub(crate) fn new(sql: &str, catalog: &str, schema: &str) -> Self {
        Self {
            sql: sql.to_owned(),
            catalog: catalog.to_owned(),
            schema: schema.to_owned(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: Arc<QueryResult>,
    created_at: Instant,
}

/// In-process result cache shared by clones of one client.
#[derive(Clone, Debug)]
pub(crate) struct ResultCache {
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl ResultCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns a live entry; an expired one is evicted on the way.
    pub(crate) fn get(&self, key: &CacheKey) -> Option<Arc<QueryResult>> {
        let mut entries = self.entries.lock().ok()?;
        let (fresh, result) = entries
            .get(key)
            .map(|entry| (entry.created_at.elapsed() < self.ttl, entry.result.clone()))?;
        if fresh {
            Some(result)
        } else {
            entries.remove(key);
            None
        }
    }

    pub(crate) fn insert(&self, key: CacheKey, result: QueryResult) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    result: Arc::new(result),
                    created_at: Instant::now(),
                },
            );
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub(crate) fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}
