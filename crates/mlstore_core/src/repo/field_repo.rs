//! Field repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append field definitions to a numbers project in call order.
//! - Read them back in exactly that order.
//!
//! # Invariants
//! - Field order is `sort_order ASC`, allocated inside the same immediate
//!   transaction as the insert.
//! - Every query is scoped by `(projectid, userid, classid)`.

use crate::model::field::{Field, FieldSpec, FieldType};
use crate::model::ids::{generate_id, ProjectKey};
use crate::model::validation::MAX_FIELDS_PER_PROJECT;
use crate::repo::ensure_schema_ready;
use crate::repo::project_repo::{ensure_project_owned, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

/// Repository interface for project field definitions.
pub trait FieldRepository {
    /// Appends one field after the project's existing fields.
    fn add_field(&self, key: &ProjectKey<'_>, spec: &FieldSpec) -> RepoResult<Field>;
    /// Lists fields in insertion order. Unknown projects yield no rows.
    fn list_fields(&self, key: &ProjectKey<'_>) -> RepoResult<Vec<Field>>;
    /// Deletes every field of the project. Returns removed rows.
    fn delete_fields(&self, key: &ProjectKey<'_>) -> RepoResult<usize>;
}

/// SQLite-backed field repository.
pub struct SqliteFieldRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFieldRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["projects", "project_fields"])?;
        Ok(Self { conn })
    }
}

impl FieldRepository for SqliteFieldRepository<'_> {
    fn add_field(&self, key: &ProjectKey<'_>, spec: &FieldSpec) -> RepoResult<Field> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_project_owned(&tx, key)?;

        let (existing, next_order): (i64, i64) = tx.query_row(
            "SELECT COUNT(*), COALESCE(MAX(sort_order), -1) + 1
             FROM project_fields
             WHERE projectid = ?1;",
            [key.projectid],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if usize::try_from(existing).unwrap_or(usize::MAX) >= MAX_FIELDS_PER_PROJECT {
            return Err(RepoError::FieldLimitReached {
                max: MAX_FIELDS_PER_PROJECT,
            });
        }

        let field = insert_field(&tx, key, spec, next_order)?;
        tx.commit()?;
        Ok(field)
    }

    fn list_fields(&self, key: &ProjectKey<'_>) -> RepoResult<Vec<Field>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                userid,
                classid,
                projectid,
                name,
                type,
                choices
             FROM project_fields
             WHERE projectid = ?1
               AND userid = ?2
               AND classid = ?3
             ORDER BY sort_order ASC;",
        )?;
        let mut rows = stmt.query(params![key.projectid, key.userid, key.classid])?;
        let mut fields = Vec::new();
        while let Some(row) = rows.next()? {
            fields.push(parse_field_row(row)?);
        }
        Ok(fields)
    }

    fn delete_fields(&self, key: &ProjectKey<'_>) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM project_fields
             WHERE projectid = ?1
               AND userid = ?2
               AND classid = ?3;",
            params![key.projectid, key.userid, key.classid],
        )?;
        Ok(removed)
    }
}

/// Inserts one field row at `sort_order` on the caller's connection or
/// open transaction. The name is stored trimmed.
pub(crate) fn insert_field(
    conn: &Connection,
    key: &ProjectKey<'_>,
    spec: &FieldSpec,
    sort_order: i64,
) -> RepoResult<Field> {
    let choices = spec.stored_choices();
    let choices_json = serde_json::to_string(&choices)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode field choices: {err}")))?;
    let name = spec.name.trim();

    let id = generate_id();
    conn.execute(
        "INSERT INTO project_fields (
            id,
            userid,
            classid,
            projectid,
            name,
            type,
            choices,
            sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            id.as_str(),
            key.userid,
            key.classid,
            key.projectid,
            name,
            spec.kind.as_str(),
            choices_json,
            sort_order,
        ],
    )?;

    Ok(Field {
        id,
        userid: key.userid.to_string(),
        classid: key.classid.to_string(),
        projectid: key.projectid.to_string(),
        name: name.to_string(),
        kind: spec.kind,
        choices,
    })
}

fn parse_field_row(row: &Row<'_>) -> RepoResult<Field> {
    let type_text: String = row.get("type")?;
    let kind = FieldType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid field type `{type_text}` in project_fields.type"))
    })?;

    let choices_text: String = row.get("choices")?;
    let choices: Vec<String> = serde_json::from_str(&choices_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid choices `{choices_text}` in project_fields.choices: {err}"
        ))
    })?;

    Ok(Field {
        id: row.get("id")?,
        userid: row.get("userid")?,
        classid: row.get("classid")?,
        projectid: row.get("projectid")?,
        name: row.get("name")?,
        kind,
        choices,
    })
}
