//! Request-scoped result cache.
//!
//! One visualization request may touch the same (device, category) pair more
//! than once. A [`RequestCache`] is created for the request, remembers each
//! fetched batch under its [`DevicePath::cache_key`](afdd_types::DevicePath::cache_key)
//! and is dropped with the request, so nothing survives into the next one.

use std::collections::HashMap;
use std::future::Future;

use crate::HistorianValues;

/// Cache of historian batches for a single request.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: HashMap<String, HistorianValues>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&HistorianValues> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, values: HistorianValues) {
        self.entries.insert(key.into(), values);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached batch for `key`, running `fetch` only on a miss.
    ///
    /// A failed fetch leaves the cache untouched.
    pub async fn get_or_fetch<F, Fut, E>(
        &mut self,
        key: &str,
        fetch: F,
    ) -> Result<&HistorianValues, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HistorianValues, E>>,
    {
        if !self.entries.contains_key(key) {
            let values = fetch().await?;
            self.entries.insert(key.to_string(), values);
        }
        Ok(&self.entries[key])
    }

    /// All cached topics merged into one batch.
    pub fn merged(&self) -> HistorianValues {
        let mut merged = HistorianValues::new();
        for values in self.entries.values() {
            for (topic, pairs) in values {
                merged
                    .entry(topic.clone())
                    .or_default()
                    .extend(pairs.iter().cloned());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn batch(topic: &str) -> HistorianValues {
        let mut values = HistorianValues::new();
        values.insert(topic.to_string(), vec![json!(["2024-01-01T00:00:00", 0])]);
        values
    }

    #[test]
    fn test_get_or_fetch_fetches_once() {
        let calls = Cell::new(0);
        let mut cache = RequestCache::new();

        for _ in 0..3 {
            let result: Result<_, ()> = tokio_test::block_on(cache.get_or_fetch("k", || {
                calls.set(calls.get() + 1);
                async { Ok(batch("t/1")) }
            }));
            assert_eq!(result.unwrap().len(), 1);
        }

        assert_eq!(calls.get(), 1);
        assert!(cache.contains("k"));
    }

    #[test]
    fn test_failed_fetch_is_not_cached() {
        let mut cache = RequestCache::new();
        let result = tokio_test::block_on(cache.get_or_fetch("k", || async { Err("down") }));
        assert_eq!(result.err(), Some("down"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_merged() {
        let mut cache = RequestCache::new();
        cache.insert("a", batch("t/1"));
        cache.insert("b", batch("t/1"));
        cache.insert("c", batch("t/2"));

        let merged = cache.merged();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["t/1"].len(), 2);
        assert!(cache.get("a").is_some());
        assert_eq!(cache.len(), 3);
    }
}
