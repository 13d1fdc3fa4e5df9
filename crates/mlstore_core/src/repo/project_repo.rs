//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist project metadata and answer scoped project lookups.
//! - Own the per-project label list (the only shared mutable list in the
//!   store) and serialize its mutations.
//!
//! # Invariants
//! - Label mutations run inside `BEGIN IMMEDIATE`, so concurrent writers on
//!   any connection to the same file apply one after another.
//! - `UNIQUE(projectid, label)` backs the no-duplicates rule.
//! - A project owned by another user/class is reported as not found.
//! - A project and its initial fields become visible in one commit.

use crate::db::DbError;
use crate::model::ids::{generate_id, ProjectId, ProjectKey};
use crate::model::project::{NewProject, Project, ProjectType};
use crate::query::scope::ProjectScope;
use crate::repo::ensure_schema_ready;
use crate::repo::field_repo::insert_field;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) const PROJECT_SELECT_SQL: &str = "SELECT
    p.id AS id,
    p.userid AS userid,
    p.classid AS classid,
    p.type AS type,
    p.name AS name,
    p.language AS language,
    p.is_crowd_sourced AS is_crowd_sourced,
    (SELECT COUNT(*) FROM project_fields f WHERE f.projectid = p.id) AS numfields
FROM projects p";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by project, field and training repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Project is missing, or is owned by a different user/class.
    ProjectNotFound(ProjectId),
    /// The project already holds the maximum number of fields.
    FieldLimitReached { max: usize },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "Project not found: {id}"),
            Self::FieldLimitReached { max } => {
                write!(f, "project already has the maximum of {max} fields")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "project store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "project store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted project data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for project metadata and label lists.
pub trait ProjectRepository {
    /// Inserts project metadata together with its fields, in request
    /// order, and returns the generated id. Nothing is stored on failure.
    fn create_project(&self, request: &NewProject) -> RepoResult<ProjectId>;
    fn get_project(&self, projectid: &str) -> RepoResult<Option<Project>>;
    fn list_projects(&self, scope: &ProjectScope<'_>) -> RepoResult<Vec<Project>>;
    fn count_projects(&self, scope: &ProjectScope<'_>) -> RepoResult<u64>;
    /// Current label list. Fails with `ProjectNotFound` for unknown keys.
    fn get_labels(&self, key: &ProjectKey<'_>) -> RepoResult<Vec<String>>;
    /// Appends one already-normalized label unless it is present.
    fn add_label(&self, key: &ProjectKey<'_>, label: &str) -> RepoResult<Vec<String>>;
    /// Removes one label if present, keeping the order of the rest.
    fn remove_label(&self, key: &ProjectKey<'_>, label: &str) -> RepoResult<Vec<String>>;
    /// Drops the whole label list of a project. Returns removed rows.
    fn delete_labels(&self, projectid: &str) -> RepoResult<usize>;
    /// Deletes the project record. Returns whether a row was removed.
    fn delete_project(&self, key: &ProjectKey<'_>) -> RepoResult<bool>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["projects", "project_labels", "project_fields"])?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, request: &NewProject) -> RepoResult<ProjectId> {
        let id = generate_id();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO projects (
                id,
                userid,
                classid,
                type,
                name,
                language,
                is_crowd_sourced
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id.as_str(),
                request.userid.as_str(),
                request.classid.as_str(),
                request.kind.as_str(),
                request.name.trim(),
                request.language.as_str(),
                i64::from(request.is_crowd_sourced),
            ],
        )?;

        let key = ProjectKey::new(&request.userid, &request.classid, &id);
        for (sort_order, spec) in (0_i64..).zip(&request.fields) {
            insert_field(&tx, &key, spec, sort_order)?;
        }
        tx.commit()?;

        Ok(id)
    }

    fn get_project(&self, projectid: &str) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE p.id = ?1;"))?;
        let mut rows = stmt.query([projectid])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_projects(&self, scope: &ProjectScope<'_>) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&scope.list_sql(PROJECT_SELECT_SQL))?;
        let mut rows = stmt.query(params_from_iter(scope.bind_values()))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(self.conn, row)?);
        }
        Ok(projects)
    }

    fn count_projects(&self, scope: &ProjectScope<'_>) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &scope.count_sql(),
            params_from_iter(scope.bind_values()),
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative project count `{count}`")))
    }

    fn get_labels(&self, key: &ProjectKey<'_>) -> RepoResult<Vec<String>> {
        ensure_project_owned(self.conn, key)?;
        load_labels(self.conn, key.projectid)
    }

    fn add_label(&self, key: &ProjectKey<'_>, label: &str) -> RepoResult<Vec<String>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_project_owned(&tx, key)?;

        let mut labels = load_labels(&tx, key.projectid)?;
        if labels.iter().any(|existing| existing == label) {
            return Ok(labels);
        }

        tx.execute(
            "INSERT INTO project_labels (projectid, label, sort_order)
             SELECT ?1, ?2, COALESCE(MAX(sort_order), -1) + 1
             FROM project_labels
             WHERE projectid = ?1;",
            params![key.projectid, label],
        )?;
        tx.commit()?;

        labels.push(label.to_string());
        Ok(labels)
    }

    fn remove_label(&self, key: &ProjectKey<'_>, label: &str) -> RepoResult<Vec<String>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_project_owned(&tx, key)?;

        let mut labels = load_labels(&tx, key.projectid)?;
        if !labels.iter().any(|existing| existing == label) {
            return Ok(labels);
        }

        tx.execute(
            "DELETE FROM project_labels WHERE projectid = ?1 AND label = ?2;",
            params![key.projectid, label],
        )?;
        tx.commit()?;

        labels.retain(|existing| existing != label);
        Ok(labels)
    }

    fn delete_labels(&self, projectid: &str) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM project_labels WHERE projectid = ?1;",
            [projectid],
        )?;
        Ok(removed)
    }

    fn delete_project(&self, key: &ProjectKey<'_>) -> RepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM projects
             WHERE id = ?1
               AND userid = ?2
               AND classid = ?3;",
            params![key.projectid, key.userid, key.classid],
        )?;
        Ok(removed > 0)
    }
}

/// Fails with `ProjectNotFound` unless the key addresses an existing
/// project owned by `key.userid` in `key.classid`.
pub(crate) fn ensure_project_owned(conn: &Connection, key: &ProjectKey<'_>) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM projects
            WHERE id = ?1
              AND userid = ?2
              AND classid = ?3
        );",
        params![key.projectid, key.userid, key.classid],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::ProjectNotFound(key.projectid.to_string()))
    }
}

fn load_labels(conn: &Connection, projectid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT label
         FROM project_labels
         WHERE projectid = ?1
         ORDER BY sort_order ASC;",
    )?;
    let mut rows = stmt.query([projectid])?;
    let mut labels = Vec::new();
    while let Some(row) = rows.next()? {
        labels.push(row.get(0)?);
    }
    Ok(labels)
}

fn parse_project_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Project> {
    let id: String = row.get("id")?;

    let type_text: String = row.get("type")?;
    let kind = ProjectType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid project type `{type_text}` in projects.type"))
    })?;

    let is_crowd_sourced = match row.get::<_, i64>("is_crowd_sourced")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_crowd_sourced value `{other}` in projects.is_crowd_sourced"
            )));
        }
    };

    let labels = load_labels(conn, &id)?;
    Ok(Project {
        id,
        userid: row.get("userid")?,
        classid: row.get("classid")?,
        kind,
        name: row.get("name")?,
        language: row.get("language")?,
        labels,
        is_crowd_sourced,
        numfields: row.get("numfields")?,
    })
}
