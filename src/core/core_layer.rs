// The core module contains all business logic.
// Each feature gets its own submodule; traits it consumes live next to it.

#[path = "cache/ttl_cache.rs"]
pub mod cache;

#[path = "sync/mod.rs"]
pub mod sync;

#[path = "tasks/mod.rs"]
pub mod tasks;
