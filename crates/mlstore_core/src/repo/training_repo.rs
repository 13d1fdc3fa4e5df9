//! Training example repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append labelled examples for a project and count them per label.
//! - Remove all examples of a project during cascading deletes.
//!
//! # Invariants
//! - Examples are keyed by `projectid` only; no foreign key ties them to
//!   the projects table and labels are not checked against the project.
//! - An example is only written while its project exists: the check and
//!   the insert share one immediate transaction.
//! - A `(projectid, kind, payload, label)` tuple is stored at most once.
//! - Listing order is insertion order.

use crate::model::ids::generate_id;
use crate::model::training::{TrainingExample, TrainingKind, TrainingPayload};
use crate::repo::ensure_schema_ready;
use crate::repo::project_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;

const TRAINING_DEFAULT_LIMIT: u32 = 50;
const TRAINING_LIMIT_MAX: u32 = 500;

/// Pagination options for listing training examples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingListQuery {
    /// Maximum rows to return. Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for training examples.
pub trait TrainingRepository {
    /// Stores one example, or returns the identical one already stored.
    /// Fails with `ProjectNotFound` when the project is gone.
    fn store_training(
        &self,
        projectid: &str,
        payload: &TrainingPayload,
        label: &str,
    ) -> RepoResult<TrainingExample>;
    fn count_training(&self, projectid: &str) -> RepoResult<u64>;
    /// Counts examples per stored label string, including labels the
    /// project no longer has.
    fn count_training_by_label(&self, projectid: &str) -> RepoResult<HashMap<String, u64>>;
    fn list_training(
        &self,
        projectid: &str,
        query: &TrainingListQuery,
    ) -> RepoResult<Vec<TrainingExample>>;
    /// Deletes every example of the project. Returns removed rows.
    fn delete_training(&self, projectid: &str) -> RepoResult<usize>;
}

/// SQLite-backed training repository.
pub struct SqliteTrainingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTrainingRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["projects", "training_examples"])?;
        Ok(Self { conn })
    }
}

impl TrainingRepository for SqliteTrainingRepository<'_> {
    fn store_training(
        &self,
        projectid: &str,
        payload: &TrainingPayload,
        label: &str,
    ) -> RepoResult<TrainingExample> {
        let kind = payload.kind();
        let encoded = encode_payload(payload)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let project_exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1);",
            [projectid],
            |row| row.get(0),
        )?;
        if project_exists != 1 {
            return Err(RepoError::ProjectNotFound(projectid.to_string()));
        }

        let new_id = generate_id();
        tx.execute(
            "INSERT INTO training_examples (id, projectid, kind, payload, label)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (projectid, kind, payload, label) DO NOTHING;",
            params![new_id.as_str(), projectid, kind.as_str(), encoded, label],
        )?;
        let id: Option<String> = tx
            .query_row(
                "SELECT id
                 FROM training_examples
                 WHERE projectid = ?1
                   AND kind = ?2
                   AND payload = ?3
                   AND label = ?4;",
                params![projectid, kind.as_str(), encoded, label],
                |row| row.get(0),
            )
            .optional()?;
        let id = id.ok_or_else(|| {
            RepoError::InvalidData("training insert left no matching row".to_string())
        })?;
        tx.commit()?;

        Ok(TrainingExample {
            id,
            projectid: projectid.to_string(),
            payload: payload.clone(),
            label: label.to_string(),
        })
    }

    fn count_training(&self, projectid: &str) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM training_examples WHERE projectid = ?1;",
            [projectid],
            |row| row.get(0),
        )?;
        to_count(count)
    }

    fn count_training_by_label(&self, projectid: &str) -> RepoResult<HashMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT label, COUNT(*)
             FROM training_examples
             WHERE projectid = ?1
             GROUP BY label;",
        )?;
        let mut rows = stmt.query([projectid])?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next()? {
            let label: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.insert(label, to_count(count)?);
        }
        Ok(counts)
    }

    fn list_training(
        &self,
        projectid: &str,
        query: &TrainingListQuery,
    ) -> RepoResult<Vec<TrainingExample>> {
        let limit = normalize_training_limit(query.limit);
        let mut stmt = self.conn.prepare(
            "SELECT id, projectid, kind, payload, label
             FROM training_examples
             WHERE projectid = ?1
             ORDER BY rowid ASC
             LIMIT ?2 OFFSET ?3;",
        )?;
        let mut rows = stmt.query(params![
            projectid,
            i64::from(limit),
            i64::from(query.offset)
        ])?;
        let mut examples = Vec::new();
        while let Some(row) = rows.next()? {
            examples.push(parse_training_row(row)?);
        }
        Ok(examples)
    }

    fn delete_training(&self, projectid: &str) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM training_examples WHERE projectid = ?1;",
            [projectid],
        )?;
        Ok(removed)
    }
}

/// Normalizes list limit according to the training list contract.
pub fn normalize_training_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => TRAINING_DEFAULT_LIMIT,
        Some(value) if value > TRAINING_LIMIT_MAX => TRAINING_LIMIT_MAX,
        Some(value) => value,
    }
}

fn encode_payload(payload: &TrainingPayload) -> RepoResult<String> {
    match payload {
        TrainingPayload::Text(text) | TrainingPayload::Image(text) => Ok(text.clone()),
        TrainingPayload::Numbers(values) | TrainingPayload::Sound(values) => {
            serde_json::to_string(values).map_err(|err| {
                RepoError::InvalidData(format!("cannot encode training values: {err}"))
            })
        }
    }
}

fn decode_payload(kind: TrainingKind, encoded: String) -> RepoResult<TrainingPayload> {
    let decode_values = |encoded: &str| -> RepoResult<Vec<f64>> {
        serde_json::from_str(encoded).map_err(|err| {
            RepoError::InvalidData(format!(
                "invalid values in training_examples.payload: {err}"
            ))
        })
    };

    match kind {
        TrainingKind::Text => Ok(TrainingPayload::Text(encoded)),
        TrainingKind::Image => Ok(TrainingPayload::Image(encoded)),
        TrainingKind::Numbers => Ok(TrainingPayload::Numbers(decode_values(&encoded)?)),
        TrainingKind::Sound => Ok(TrainingPayload::Sound(decode_values(&encoded)?)),
    }
}

fn parse_training_row(row: &Row<'_>) -> RepoResult<TrainingExample> {
    let kind_text: String = row.get("kind")?;
    let kind = TrainingKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid training kind `{kind_text}` in training_examples.kind"
        ))
    })?;

    Ok(TrainingExample {
        id: row.get("id")?,
        projectid: row.get("projectid")?,
        payload: decode_payload(kind, row.get("payload")?)?,
        label: row.get("label")?,
    })
}

fn to_count(value: i64) -> RepoResult<u64> {
    u64::try_from(value).map_err(|_| RepoError::InvalidData(format!("negative count `{value}`")))
}
