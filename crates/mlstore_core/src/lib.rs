//! Core storage for ML training projects.
//! This crate is the single source of truth for project, label, field and
//! training-example invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod throttle;

pub use config::{store_config, ConfigError, StoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status, LoggingError};
pub use model::field::{Field, FieldSpec, FieldType};
pub use model::ids::{FieldId, ProjectId, TrainingId};
pub use model::project::{NewProject, Project, ProjectType};
pub use model::training::{TrainingExample, TrainingKind, TrainingPayload};
pub use model::validation::ValidationError;
pub use query::scope::ProjectScope;
pub use repo::project_repo::{RepoError, RepoResult};
pub use service::project_service::{
    ProjectStore, ProjectStoreError, SqliteProjectStore, StoreResult,
};
pub use throttle::SequentialBackoff;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns the newest schema version this build can open.
pub fn schema_version() -> u32 {
    db::migrations::latest_version()
}
