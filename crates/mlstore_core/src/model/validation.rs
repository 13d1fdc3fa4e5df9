//! Input validation errors and limits.
//!
//! Validation failures are caller errors. They are distinct from the
//! silently accepted label no-ops (blank label, duplicate add, absent
//! remove), which never surface as errors.

use crate::model::project::ProjectType;
use crate::model::training::TrainingKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum project name length in characters, after trimming.
pub const MAX_PROJECT_NAME_CHARS: usize = 36;
/// Maximum number of fields attached to one numbers project.
pub const MAX_FIELDS_PER_PROJECT: usize = 10;
/// Maximum field name length in characters, after trimming.
pub const MAX_FIELD_NAME_CHARS: usize = 12;
/// Minimum number of choices for a multichoice field.
pub const MIN_FIELD_CHOICES: usize = 2;
/// Maximum number of choices for a multichoice field.
pub const MAX_FIELD_CHOICES: usize = 9;
/// Maximum choice length in characters, after trimming.
pub const MAX_CHOICE_CHARS: usize = 9;
/// Maximum text training example length in characters.
pub const MAX_TEXT_TRAINING_CHARS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankProjectName,
    ProjectNameTooLong { max: usize },
    /// Field definitions were supplied for a project type that has none.
    FieldsNotSupported(ProjectType),
    TooManyFields { max: usize },
    BlankFieldName,
    FieldNameTooLong { max: usize },
    NotEnoughChoices { min: usize },
    TooManyChoices { max: usize },
    InvalidChoice(String),
    DuplicateChoice(String),
    LabelTooLong { max: usize },
    BlankTrainingLabel,
    BlankTrainingText,
    TrainingTextTooLong { max: usize },
    BlankImageUrl,
    EmptyTrainingData,
    NonFiniteTrainingValue,
    /// Training payload shape does not fit the project type.
    PayloadTypeMismatch {
        project: ProjectType,
        payload: TrainingKind,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankProjectName => write!(f, "project name must not be blank"),
            Self::ProjectNameTooLong { max } => {
                write!(f, "project name must be at most {max} characters")
            }
            Self::FieldsNotSupported(kind) => {
                write!(f, "projects of type `{}` do not have fields", kind.as_str())
            }
            Self::TooManyFields { max } => write!(f, "a project can have at most {max} fields"),
            Self::BlankFieldName => write!(f, "field name must not be blank"),
            Self::FieldNameTooLong { max } => {
                write!(f, "field name must be at most {max} characters")
            }
            Self::NotEnoughChoices { min } => {
                write!(f, "multichoice fields need at least {min} choices")
            }
            Self::TooManyChoices { max } => {
                write!(f, "multichoice fields can have at most {max} choices")
            }
            Self::InvalidChoice(value) => write!(f, "invalid field choice: `{value}`"),
            Self::DuplicateChoice(value) => write!(f, "duplicate field choice: `{value}`"),
            Self::LabelTooLong { max } => write!(f, "label must be at most {max} characters"),
            Self::BlankTrainingLabel => write!(f, "training label must not be blank"),
            Self::BlankTrainingText => write!(f, "training text must not be blank"),
            Self::TrainingTextTooLong { max } => {
                write!(f, "training text must be at most {max} characters")
            }
            Self::BlankImageUrl => write!(f, "training image url must not be blank"),
            Self::EmptyTrainingData => write!(f, "training data must not be empty"),
            Self::NonFiniteTrainingValue => write!(f, "training data values must be finite"),
            Self::PayloadTypeMismatch { project, payload } => write!(
                f,
                "`{}` training data cannot be stored in a `{}` project",
                payload.as_str(),
                project.as_str()
            ),
        }
    }
}

impl Error for ValidationError {}
