// Key-value cache with per-entry expiry.
// The sync code caches crew mappings and sheet-id lookups through this trait so
// tests can swap in a fresh in-memory instance.

use std::time::Duration;

pub trait TtlCache: Send + Sync {
    /// Returns the value if present and not expired.
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String, ttl: Duration);
    fn invalidate(&self, key: &str);
}
