// DashMap-backed TtlCache. Expired entries are dropped lazily on read.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::core::cache::TtlCache;

pub struct InMemoryTtlCache {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryTtlCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for InMemoryTtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlCache for InMemoryTtlCache {
    fn get(&self, key: &str) -> Option<String> {
        {
            let entry = self.entries.get(key)?;
            if entry.1 > Instant::now() {
                return Some(entry.0.clone());
            }
        }

        self.entries.remove(key);
        None
    }

    fn put(&self, key: &str, value: String, ttl: Duration) {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}
