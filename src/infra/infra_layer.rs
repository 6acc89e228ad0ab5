// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "cache/mod.rs"]
pub mod cache;

#[path = "notify/mod.rs"]
pub mod notify;

#[path = "sheets/mod.rs"]
pub mod sheets;
