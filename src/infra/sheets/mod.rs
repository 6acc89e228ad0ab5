// Sheets infra layer.
// - `google_auth.rs` gets OAuth2 tokens for a service account.
// - `google_sheets_store.rs` talks to the Sheets v4 REST API.
// - `in_memory_store.rs` keeps grids in memory for tests.

pub mod google_auth;
pub mod google_sheets_store;
#[cfg(test)]
pub mod in_memory_store;

pub use google_auth::ServiceAccountAuth;
pub use google_sheets_store::GoogleSheetsStore;
#[cfg(test)]
pub use in_memory_store::{InMemorySheetStore, WriteOp};
