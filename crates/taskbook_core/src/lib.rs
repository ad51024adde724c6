//! Core domain logic for taskbook.
//! This crate is the single source of truth for task/list/tag invariants.

pub mod config;
pub mod db;
pub mod exchange;
pub mod id;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod view;

pub use config::{ConfigError, CoreConfig};
pub use exchange::snapshot::{export_snapshot, import_snapshot, ImportError, SNAPSHOT_FILE_NAME};
pub use id::{id_generator, IdGenerator, IdStrategy, PseudoRandomIdGenerator, UuidIdGenerator};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::due_date::{DueDate, DueDateParseError};
pub use model::state::{normalize_name, Collection, StoreState, DEFAULT_LIST_NAME};
pub use model::task::{Subtask, SubtaskId, Task, TaskId, TaskPatch, DRAFT_TASK_TITLE};
pub use repo::kv_repo::{KvError, KvResult, KvStore, MemoryKvStore, SqliteKvStore};
pub use repo::persistence::{PersistError, PersistenceAdapter, DEFAULT_KEY_PREFIX};
pub use service::task_service::{Applied, ServiceError, ServiceResult, TaskService};
pub use store::task_store::{ListRemoval, TaskStore};
pub use store::{StoreError, StoreResult};
pub use view::date_index::{dates_with_tasks_in_month, CalendarMonth};
pub use view::projection::{project, ProjectionCache, ViewState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
