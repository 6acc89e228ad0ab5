pub mod duplicate_resolver;
pub mod master_catalog;
pub mod record_table;
pub mod task_index;
pub mod task_models;

pub use duplicate_resolver::{resolve_duplicates, DuplicateGroup};
pub use master_catalog::MasterCatalog;
pub use record_table::RecordTable;
pub use task_index::TaskIndex;
pub use task_models::{ColumnNames, Crew, MasterTask, TaskRecord};
