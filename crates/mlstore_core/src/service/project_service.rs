//! Project store use-case service.
//!
//! # Responsibility
//! - Act as the aggregate root over project, field, label and training
//!   repositories.
//! - Validate input before anything is written.
//! - Orchestrate cascading deletes across all subordinate records.
//!
//! # Invariants
//! - Empty labels, duplicate adds and absent removes are no-ops, never errors.
//! - Label mutations on a missing (or foreign) project fail with
//!   `ProjectNotFound`; read paths return `None`/empty instead.
//! - Cascades delete leaf-first: training, fields, labels, project record,
//!   then sweep training once more. Each step is idempotent, so a retried
//!   delete finishes a partial one.

use crate::model::field::{Field, FieldSpec};
use crate::model::ids::{ProjectId, ProjectKey};
use crate::model::label::{normalize_label, validate_label};
use crate::model::project::{NewProject, Project, ProjectType};
use crate::model::training::{TrainingExample, TrainingKind, TrainingPayload};
use crate::model::validation::{ValidationError, MAX_FIELDS_PER_PROJECT};
use crate::query::scope::ProjectScope;
use crate::repo::field_repo::{FieldRepository, SqliteFieldRepository};
use crate::repo::project_repo::{
    ProjectRepository, RepoError, RepoResult, SqliteProjectRepository,
};
use crate::repo::training_repo::{
    SqliteTrainingRepository, TrainingListQuery, TrainingRepository,
};
use log::{debug, info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for project store use-cases.
#[derive(Debug)]
pub enum ProjectStoreError {
    /// Caller input failed validation; nothing was written.
    Validation(ValidationError),
    /// Target project does not exist for this user/class.
    ProjectNotFound(ProjectId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ProjectStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "Project not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent project state: {details}")
            }
        }
    }
}

impl Error for ProjectStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectStoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ProjectNotFound(id) => Self::ProjectNotFound(id),
            RepoError::FieldLimitReached { max } => {
                Self::Validation(ValidationError::TooManyFields { max })
            }
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ProjectStoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type StoreResult<T> = Result<T, ProjectStoreError>;

/// Project store facade over repository implementations.
pub struct ProjectStore<P, F, T>
where
    P: ProjectRepository,
    F: FieldRepository,
    T: TrainingRepository,
{
    projects: P,
    fields: F,
    training: T,
}

/// Project store wired to one SQLite connection.
pub type SqliteProjectStore<'conn> = ProjectStore<
    SqliteProjectRepository<'conn>,
    SqliteFieldRepository<'conn>,
    SqliteTrainingRepository<'conn>,
>;

impl<'conn> SqliteProjectStore<'conn> {
    /// Builds all repositories over one migrated connection.
    pub fn sqlite(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self::new(
            SqliteProjectRepository::try_new(conn)?,
            SqliteFieldRepository::try_new(conn)?,
            SqliteTrainingRepository::try_new(conn)?,
        ))
    }
}

impl<P, F, T> ProjectStore<P, F, T>
where
    P: ProjectRepository,
    F: FieldRepository,
    T: TrainingRepository,
{
    pub fn new(projects: P, fields: F, training: T) -> Self {
        Self {
            projects,
            fields,
            training,
        }
    }

    /// Creates a project and its fields, in the order given.
    ///
    /// Either the project and all of its fields are stored, or nothing is.
    pub fn store_project(&self, request: &NewProject) -> StoreResult<Project> {
        request.validate()?;

        let projectid = self.projects.create_project(request)?;

        info!(
            "event=project_store module=store status=ok project_id={} type={} fields={}",
            projectid,
            request.kind.as_str(),
            request.fields.len()
        );

        self.projects
            .get_project(&projectid)?
            .ok_or(ProjectStoreError::InconsistentState(
                "created project not found in read-back",
            ))
    }

    /// Gets one project by id. Absence is a normal result.
    pub fn get_project(&self, projectid: &str) -> StoreResult<Option<Project>> {
        Ok(self.projects.get_project(projectid)?)
    }

    /// Lists one user's projects within one class.
    pub fn get_projects_by_user_id(&self, userid: &str, classid: &str) -> StoreResult<Vec<Project>> {
        Ok(self
            .projects
            .list_projects(&ProjectScope::user(userid, classid))?)
    }

    /// Lists every project in a class, regardless of owner.
    pub fn get_projects_by_class_id(&self, classid: &str) -> StoreResult<Vec<Project>> {
        Ok(self.projects.list_projects(&ProjectScope::class(classid))?)
    }

    pub fn count_projects_by_user_id(&self, userid: &str, classid: &str) -> StoreResult<u64> {
        Ok(self
            .projects
            .count_projects(&ProjectScope::user(userid, classid))?)
    }

    pub fn count_projects_by_class_id(&self, classid: &str) -> StoreResult<u64> {
        Ok(self.projects.count_projects(&ProjectScope::class(classid))?)
    }

    /// Appends one field to a numbers project.
    pub fn add_field(
        &self,
        userid: &str,
        classid: &str,
        projectid: &str,
        spec: &FieldSpec,
    ) -> StoreResult<Field> {
        spec.validate()?;

        let project = self
            .projects
            .get_project(projectid)?
            .filter(|project| project.is_owned_by(userid, classid))
            .ok_or_else(|| ProjectStoreError::ProjectNotFound(projectid.to_string()))?;
        if project.kind != ProjectType::Numbers {
            return Err(ValidationError::FieldsNotSupported(project.kind).into());
        }
        if project.numfields as usize >= MAX_FIELDS_PER_PROJECT {
            return Err(ValidationError::TooManyFields {
                max: MAX_FIELDS_PER_PROJECT,
            }
            .into());
        }

        let key = ProjectKey::new(userid, classid, projectid);
        let field = self.fields.add_field(&key, spec)?;
        debug!(
            "event=field_add module=store status=ok project_id={} field_id={} type={}",
            projectid,
            field.id,
            field.kind.as_str()
        );
        Ok(field)
    }

    /// Lists a project's fields in insertion order; empty when the project
    /// is gone.
    pub fn get_number_project_fields(
        &self,
        userid: &str,
        classid: &str,
        projectid: &str,
    ) -> StoreResult<Vec<Field>> {
        let key = ProjectKey::new(userid, classid, projectid);
        Ok(self.fields.list_fields(&key)?)
    }

    /// Returns the current label list of a project.
    pub fn get_labels(
        &self,
        userid: &str,
        classid: &str,
        projectid: &str,
    ) -> StoreResult<Vec<String>> {
        let key = ProjectKey::new(userid, classid, projectid);
        Ok(self.projects.get_labels(&key)?)
    }

    /// Adds one label and returns the updated list.
    ///
    /// Blank and already-present labels leave the list unchanged.
    pub fn add_label_to_project(
        &self,
        userid: &str,
        classid: &str,
        projectid: &str,
        label: &str,
    ) -> StoreResult<Vec<String>> {
        let key = ProjectKey::new(userid, classid, projectid);
        let Some(label) = normalize_label(label) else {
            return Ok(self.projects.get_labels(&key)?);
        };
        validate_label(&label)?;

        let labels = self.projects.add_label(&key, &label)?;
        debug!(
            "event=label_add module=store status=ok project_id={} label_count={}",
            projectid,
            labels.len()
        );
        Ok(labels)
    }

    /// Removes one label and returns the updated list.
    ///
    /// Training examples stored under the label are left as they are.
    pub fn remove_label_from_project(
        &self,
        userid: &str,
        classid: &str,
        projectid: &str,
        label: &str,
    ) -> StoreResult<Vec<String>> {
        let key = ProjectKey::new(userid, classid, projectid);
        let Some(label) = normalize_label(label) else {
            return Ok(self.projects.get_labels(&key)?);
        };

        let labels = self.projects.remove_label(&key, &label)?;
        debug!(
            "event=label_remove module=store status=ok project_id={} label_count={}",
            projectid,
            labels.len()
        );
        Ok(labels)
    }

    /// Counts training examples per current label.
    ///
    /// Only labels still on the project and used by at least one example
    /// appear; examples under removed labels are ignored.
    pub fn count_training_by_label(&self, project: &Project) -> StoreResult<BTreeMap<String, u64>> {
        let stored = self.training.count_training_by_label(&project.id)?;
        let counts = project
            .labels
            .iter()
            .filter_map(|label| {
                stored
                    .get(label)
                    .filter(|count| **count > 0)
                    .map(|count| (label.clone(), *count))
            })
            .collect();
        Ok(counts)
    }

    /// Stores one training example for a project.
    ///
    /// The label does not have to be one of the project's current labels.
    pub fn store_training(
        &self,
        projectid: &str,
        payload: &TrainingPayload,
        label: &str,
    ) -> StoreResult<TrainingExample> {
        let label = normalize_label(label).ok_or(ValidationError::BlankTrainingLabel)?;
        validate_label(&label)?;
        payload.validate()?;

        // Project type is immutable; existence is checked again inside the
        // insert transaction.
        let project = self
            .projects
            .get_project(projectid)?
            .ok_or_else(|| ProjectStoreError::ProjectNotFound(projectid.to_string()))?;
        if TrainingKind::for_project(project.kind) != payload.kind() {
            return Err(ValidationError::PayloadTypeMismatch {
                project: project.kind,
                payload: payload.kind(),
            }
            .into());
        }

        Ok(self.training.store_training(projectid, payload, &label)?)
    }

    pub fn count_training(&self, projectid: &str) -> StoreResult<u64> {
        Ok(self.training.count_training(projectid)?)
    }

    /// Lists training examples in insertion order.
    pub fn get_training(
        &self,
        projectid: &str,
        limit: Option<u32>,
        offset: u32,
    ) -> StoreResult<Vec<TrainingExample>> {
        let query = TrainingListQuery { limit, offset };
        Ok(self.training.list_training(projectid, &query)?)
    }

    /// Deletes a project with its training examples, fields and labels.
    ///
    /// Returns whether the project record itself was removed. A project
    /// owned by another user/class is left untouched.
    pub fn delete_entire_project(
        &self,
        userid: &str,
        classid: &str,
        projectid: &str,
    ) -> StoreResult<bool> {
        if let Some(project) = self.projects.get_project(projectid)? {
            if !project.is_owned_by(userid, classid) {
                warn!(
                    "event=project_delete module=store status=skipped reason=owner_mismatch project_id={}",
                    projectid
                );
                return Ok(false);
            }
        }

        let key = ProjectKey::new(userid, classid, projectid);
        let training = self.training.delete_training(projectid)?;
        let fields = self.fields.delete_fields(&key)?;
        let labels = self.projects.delete_labels(projectid)?;
        let removed = self.projects.delete_project(&key)?;
        // Examples committed while the steps above ran; none can follow
        // once the project record is gone.
        let late_training = self.training.delete_training(projectid)?;

        info!(
            "event=project_delete module=store status=ok project_id={} removed={} training={} fields={} labels={}",
            projectid,
            removed,
            training + late_training,
            fields,
            labels
        );
        Ok(removed)
    }

    /// Deletes every project a user owns in a class. Returns the number
    /// of project records removed.
    pub fn delete_entire_user(&self, userid: &str, classid: &str) -> StoreResult<usize> {
        let projects = self
            .projects
            .list_projects(&ProjectScope::user(userid, classid))?;
        self.delete_all(&projects, classid)
    }

    /// Deletes every project in a class, whoever owns it. Returns the
    /// number of project records removed.
    pub fn delete_projects_by_class_id(&self, classid: &str) -> StoreResult<usize> {
        let projects = self.projects.list_projects(&ProjectScope::class(classid))?;
        self.delete_all(&projects, classid)
    }

    fn delete_all(&self, projects: &[Project], classid: &str) -> StoreResult<usize> {
        let mut removed = 0;
        for project in projects {
            if self.delete_entire_project(&project.userid, classid, &project.id)? {
                removed += 1;
            }
        }
        info!(
            "event=project_bulk_delete module=store status=ok projects={} removed={}",
            projects.len(),
            removed
        );
        Ok(removed)
    }
}
