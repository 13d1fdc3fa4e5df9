//! Project aggregate model.
//!
//! # Responsibility
//! - Define the project record and its creation request.
//! - Validate creation input before anything is persisted.
//!
//! # Invariants
//! - `id`, `userid`, `classid`, `kind`, `language` and `is_crowd_sourced`
//!   never change after creation.
//! - `labels` keeps insertion order, holds no duplicates and no blanks.
//! - `numfields` is derived from stored fields, never written directly.

use crate::model::field::FieldSpec;
use crate::model::ids::ProjectId;
use crate::model::validation::{
    ValidationError, MAX_FIELDS_PER_PROJECT, MAX_PROJECT_NAME_CHARS,
};
use serde::{Deserialize, Serialize};

/// Closed set of project kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Text,
    Images,
    Numbers,
    Sounds,
}

impl ProjectType {
    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Images => "images",
            Self::Numbers => "numbers",
            Self::Sounds => "sounds",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "images" => Some(Self::Images),
            "numbers" => Some(Self::Numbers),
            "sounds" => Some(Self::Sounds),
            _ => None,
        }
    }
}

/// Stored project record, as returned by every read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub userid: String,
    pub classid: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: ProjectType,
    pub name: String,
    pub language: String,
    pub labels: Vec<String>,
    pub is_crowd_sourced: bool,
    pub numfields: u32,
}

impl Project {
    /// Returns whether this project belongs to `userid` within `classid`.
    pub fn is_owned_by(&self, userid: &str, classid: &str) -> bool {
        self.userid == userid && self.classid == classid
    }
}

/// Creation request for `ProjectStore::store_project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub userid: String,
    pub classid: String,
    #[serde(rename = "type")]
    pub kind: ProjectType,
    pub name: String,
    pub language: String,
    /// Field definitions, added in this order. Only numbers projects may
    /// carry fields.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub is_crowd_sourced: bool,
}

impl NewProject {
    /// Creates a request with no fields that is not crowd-sourced.
    pub fn new(
        userid: impl Into<String>,
        classid: impl Into<String>,
        kind: ProjectType,
        name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            userid: userid.into(),
            classid: classid.into(),
            kind,
            name: name.into(),
            language: language.into(),
            fields: Vec::new(),
            is_crowd_sourced: false,
        }
    }

    /// Checks the whole request, including every field spec.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankProjectName);
        }
        if name.chars().count() > MAX_PROJECT_NAME_CHARS {
            return Err(ValidationError::ProjectNameTooLong {
                max: MAX_PROJECT_NAME_CHARS,
            });
        }

        if !self.fields.is_empty() && self.kind != ProjectType::Numbers {
            return Err(ValidationError::FieldsNotSupported(self.kind));
        }
        if self.fields.len() > MAX_FIELDS_PER_PROJECT {
            return Err(ValidationError::TooManyFields {
                max: MAX_FIELDS_PER_PROJECT,
            });
        }
        for field in &self.fields {
            field.validate()?;
        }

        Ok(())
    }
}
