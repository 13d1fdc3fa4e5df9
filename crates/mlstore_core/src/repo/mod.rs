//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define data access contracts for projects, labels, fields and
//!   training examples.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Tenant-scoped operations match on `(projectid, userid, classid)`.
//! - Read-modify-write sequences run inside immediate transactions.
//! - Repositories refuse connections whose schema is not fully migrated.

pub mod field_repo;
pub mod project_repo;
pub mod training_repo;

use crate::db::migrations::latest_version;
use project_repo::{RepoError, RepoResult};
use rusqlite::Connection;

/// Verifies migrations ran and the listed tables exist.
pub(crate) fn ensure_schema_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
